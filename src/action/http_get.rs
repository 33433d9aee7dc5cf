//! HTTP status probe, run from the control node.
//!
//! Unlike the other actions this one never touches the host's
//! connection: the point is to verify the service from the outside.
//! Network errors are probe failures, not transport failures.

use async_trait::async_trait;
use inventory::Host;
use runbook::HttpGetSpec;
use transport::{Connection, Result};

use super::{Action, ActionOutcome};

pub struct HttpGetAction {
    spec: HttpGetSpec,
}

impl HttpGetAction {
    pub fn new(spec: HttpGetSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Action for HttpGetAction {
    fn kind(&self) -> &'static str {
        "http_get"
    }

    async fn converge(
        &self,
        _host: &Host,
        _conn: &dyn Connection,
        check: bool,
    ) -> Result<ActionOutcome> {
        if check {
            return Ok(ActionOutcome::satisfied_with("probe skipped (check mode)"));
        }

        match reqwest::get(&self.spec.url).await {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == self.spec.status {
                    Ok(ActionOutcome::satisfied_with(format!(
                        "{}: status {status}",
                        self.spec.url
                    )))
                } else {
                    Ok(ActionOutcome::failed(format!(
                        "{}: status {status}, expected {}",
                        self.spec.url, self.spec.status
                    )))
                }
            }
            Err(e) => Ok(ActionOutcome::failed(format!("{}: {e}", self.spec.url))),
        }
    }
}
