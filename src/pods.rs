//! Pod backend selection

use crate::cli::{PodArgs, PodKind};
use rbdm_compod12::ComPod12;
use rbdm_core::pod::Pod;
use rbdm_core::{Error, Result};
use rbdm_dummy::DummyPod;
use rbdm_kevinro::KevinRoBdm12;

const KEVINRO_DEFAULT_BAUD: u32 = 9600;

/// Open the pod selected on the command line.
///
/// The port argument is either a serial device path or `ip=host:port` for a
/// pod reachable through a TCP serial bridge.
pub fn open_pod(args: &PodArgs) -> Result<Box<dyn Pod>> {
    match args.pod {
        PodKind::Compod12 => {
            let port = required_port(args)?;
            if let Some((host, tcp_port)) = parse_tcp(port)? {
                Ok(Box::new(ComPod12::open_tcp(host, tcp_port)?))
            } else {
                let baud = args.baud.unwrap_or(rbdm_compod12::device::DEFAULT_BAUD);
                Ok(Box::new(ComPod12::open_serial(port, baud)?))
            }
        }
        PodKind::Kevinro => {
            let port = required_port(args)?;
            if parse_tcp(port)?.is_some() {
                return Err(Error::Communication(
                    "the BDM12 needs RTS/CTS control and cannot run over TCP".into(),
                ));
            }
            let baud = args.baud.unwrap_or(KEVINRO_DEFAULT_BAUD);
            Ok(Box::new(KevinRoBdm12::open_serial(port, baud)?))
        }
        PodKind::Dummy => Ok(Box::new(ComPod12::new(DummyPod::new_default()))),
    }
}

fn required_port(args: &PodArgs) -> Result<&str> {
    args.port
        .as_deref()
        .ok_or_else(|| Error::Communication("no port given, use --port".into()))
}

/// Split an `ip=host:port` argument; `Ok(None)` means a serial device path.
fn parse_tcp(port: &str) -> Result<Option<(&str, u16)>> {
    let Some(spec) = port.strip_prefix("ip=") else {
        return Ok(None);
    };
    let (host, tcp_port) = spec
        .rsplit_once(':')
        .ok_or_else(|| Error::Communication(format!("expected ip=host:port, got {}", port)))?;
    let tcp_port = tcp_port
        .parse()
        .map_err(|_| Error::Communication(format!("invalid TCP port in {}", port)))?;
    Ok(Some((host, tcp_port)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_spec_parses() {
        assert_eq!(parse_tcp("ip=localhost:4712").unwrap(), Some(("localhost", 4712)));
    }

    #[test]
    fn serial_path_passes_through() {
        assert_eq!(parse_tcp("/dev/ttyUSB0").unwrap(), None);
    }

    #[test]
    fn bad_tcp_spec_rejected() {
        assert!(parse_tcp("ip=localhost").is_err());
        assert!(parse_tcp("ip=localhost:notaport").is_err());
    }
}
