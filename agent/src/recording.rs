use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collects every request/response pair of a session and writes them to a JSON file.
pub struct Recorder {
    directory: PathBuf,
    exchanges: Vec<Exchange>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub method: String,
    pub request: Value,
    /// The raw response line if it was not valid JSON.
    pub response: Value,
}

impl Recorder {
    pub fn new(directory: PathBuf) -> anyhow::Result<Self> {
        if !directory.is_dir() {
            anyhow::bail!("Directory '{}' does not exist", directory.display());
        }
        Ok(Self {
            directory,
            exchanges: Vec::new(),
        })
    }

    pub fn store_exchange(&mut self, method: &str, request: &str, response: &str) {
        self.exchanges.push(Exchange {
            method: String::from(method),
            request: as_json(request),
            response: as_json(response),
        });
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// Writes the stored exchanges to the first free `session_NNNNNN.json` and clears them.
    ///
    /// Returns the path that was written.
    pub fn write_session_recording(&mut self) -> anyhow::Result<PathBuf> {
        let filepath = (1..)
            .map(|num: u32| self.directory.join(format!("session_{:0>6}.json", num)))
            .find(|path| !path.exists())
            .ok_or_else(|| anyhow::anyhow!("No free recording file name"))?;
        let mut writer = BufWriter::new(File::create(&filepath)?);
        serde_json::to_writer_pretty(&mut writer, &std::mem::take(&mut self.exchanges))?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(filepath)
    }
}

fn as_json(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(String::from(text)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Recorder::new(dir.path().join("nope")).is_err());
    }

    #[test]
    fn sessions_get_consecutive_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::new(dir.path().to_path_buf()).unwrap();
        recorder.store_exchange(
            "get_turn",
            r#"{"jsonrpc":"2.0","id":1,"method":"get_turn","params":{}}"#,
            r#"{"jsonrpc":"2.0","id":1,"result":{"isAgentTurn":true}}"#,
        );
        recorder.store_exchange("make_move", "{}", "garbage");
        let first = recorder.write_session_recording().unwrap();
        assert!(recorder.exchanges().is_empty());
        let second = recorder.write_session_recording().unwrap();
        assert_eq!(first, dir.path().join("session_000001.json"));
        assert_eq!(second, dir.path().join("session_000002.json"));

        let written: Vec<Exchange> =
            serde_json::from_str(&std::fs::read_to_string(first).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].response["result"], json!({"isAgentTurn": true}));
        assert_eq!(written[1].response, json!("garbage"));
    }
}
