use std::io::Write;

use crate::bench::worker::{KvResponse, Worker};
use crate::Result;

/// One smoke request and what the server answered
#[derive(Debug, Clone)]
pub struct SmokeStep {
    pub label: &'static str,
    pub response: KvResponse,
}

/// Exercise each key-value endpoint once.
///
/// Inserts `test=test`, updates it to the model label, reads it back,
/// reads a key that was never written, then deletes `test`.
pub async fn run_smoke(worker: &Worker) -> Result<Vec<SmokeStep>> {
    let model = worker.model();
    let steps = vec![
        ("insert test", worker.insert_kvp("test", "test").await?),
        ("update test", worker.update_kvp("test", model).await?),
        ("get test", worker.get_kvp("test").await?),
        ("get baz", worker.get_kvp("baz").await?),
        ("delete test", worker.delete_kvp("test").await?),
    ];
    Ok(steps
        .into_iter()
        .map(|(label, response)| SmokeStep { label, response })
        .collect())
}

/// Print each step as `label: status body`
pub fn write_smoke<W: Write>(out: &mut W, steps: &[SmokeStep]) -> Result<()> {
    for step in steps {
        writeln!(
            out,
            "{}: {} {}",
            step.label, step.response.status, step.response.body
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn step(label: &'static str, status: u16, body: &str) -> SmokeStep {
        SmokeStep {
            label,
            response: KvResponse {
                status,
                body: body.to_string(),
                latency: Duration::from_millis(1),
            },
        }
    }

    #[test]
    fn test_write_smoke_lines() {
        let mut out = Vec::new();
        write_smoke(&mut out, &[step("get test", 200, "{}"), step("get baz", 404, "")]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "get test: 200 {}\nget baz: 404 \n");
    }
}
