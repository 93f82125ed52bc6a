//! Transparent recovery from a closed or faulted device transport

use tracing::{info, warn};

use crate::device::port_trait::PortOpener;
use crate::device::DeviceLink;
use crate::error::Result;

/// Reopen a faulted device link so the interrupted cycle can be retried.
///
/// One attempt, no retry budget: a device that cannot be reopened after a
/// fault is an unrecoverable run, and the open error propagates as fatal.
pub fn recover<O: PortOpener>(link: &mut DeviceLink<O>) -> Result<()> {
    warn!("Device transport fault, reopening");
    link.close();
    link.open()?;
    info!("Device transport recovered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerialConfig;
    use crate::device::port_trait::mocks::{QueueOpener, ScriptedPort};
    use crate::error::SurveyError;

    fn test_config() -> SerialConfig {
        SerialConfig {
            port: "mock".to_string(),
            baud_rate: 115_200,
            timeout_ms: 50,
            reset_settle_ms: 0,
            response_limit: 256,
        }
    }

    #[test]
    fn test_recover_reopens_link() {
        let opener = QueueOpener::new(vec![
            ScriptedPort::new(vec![]),
            ScriptedPort::new(vec![]),
        ]);
        let mut link = DeviceLink::new(opener, &test_config());
        link.open().unwrap();

        recover(&mut link).unwrap();
        assert!(link.is_open());
    }

    #[test]
    fn test_recover_failure_propagates() {
        let opener = QueueOpener::new(vec![ScriptedPort::new(vec![])])
            .failing_opens(vec![2]);
        let mut link = DeviceLink::new(opener, &test_config());
        link.open().unwrap();

        let err = recover(&mut link).unwrap_err();
        assert!(matches!(err, SurveyError::TransportUnavailable(_)));
        assert!(!link.is_open());
    }
}
