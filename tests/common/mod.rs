//! Test doubles for the `snow` process boundary.

use std::sync::Mutex;

use async_trait::async_trait;
use snowflake_admin::snow::{SnowError, SnowOutput, SnowRunner};

type Responder = Box<dyn Fn(&[String]) -> Result<SnowOutput, SnowError> + Send + Sync>;

/// Records every argument list and answers with `respond`.
pub struct RecordingSnow {
    calls: Mutex<Vec<Vec<String>>>,
    respond: Responder,
}

impl RecordingSnow {
    pub fn new(
        respond: impl Fn(&[String]) -> Result<SnowOutput, SnowError> + Send + Sync + 'static,
    ) -> Self {
        RecordingSnow {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }
    #[allow(dead_code)]
    pub fn succeeding() -> Self {
        RecordingSnow::new(|_| Ok(SnowOutput::default()))
    }
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnowRunner for RecordingSnow {
    async fn run(&self, args: &[String]) -> Result<SnowOutput, SnowError> {
        self.calls.lock().unwrap().push(args.to_vec());
        (self.respond)(args)
    }
}

pub fn failed(stderr: &str) -> SnowError {
    SnowError::Failed {
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.into(),
    }
}
