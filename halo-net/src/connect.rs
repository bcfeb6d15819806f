//! Dial-with-retry, generalizing the teacher's own connection-setup
//! loop (`mpc-net::multi::Connections::connect_to_all`): a listener on
//! the other end may not have bound yet, so a freshly-refused or reset
//! connection is retried on a short backoff rather than treated as
//! fatal, up to a bounded wait.

use std::net::SocketAddr;
use std::time::Duration;

use log::debug;
use tokio::net::TcpStream;
use tokio::time::sleep;

use crate::error::CommError;

const RETRY_BACKOFF: Duration = Duration::from_millis(10);
const MAX_WAIT: Duration = Duration::from_secs(30);

pub(crate) async fn connect_with_retry(rank: usize, addr: SocketAddr) -> Result<TcpStream, CommError> {
    let mut waited = Duration::ZERO;
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::ConnectionReset
                ) =>
            {
                if waited >= MAX_WAIT {
                    return Err(CommError::Connect { rank, source: e });
                }
                debug!("connect to rank {rank} refused, retrying");
                sleep(RETRY_BACKOFF).await;
                waited += RETRY_BACKOFF;
            }
            Err(e) => return Err(CommError::Connect { rank, source: e }),
        }
    }
}
