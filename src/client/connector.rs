//! TCP connection setup shared by the bridge clients

use tokio::net::TcpStream;

use crate::error::PropagationError;

use super::config::ClientConfig;

/// Connect to the hub within the configured timeout
pub(crate) async fn connect(config: &ClientConfig) -> Result<TcpStream, PropagationError> {
    let stream = match tokio::time::timeout(
        config.connect_timeout,
        TcpStream::connect(config.hub_addr.as_str()),
    )
    .await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(PropagationError::Connect {
                addr: config.hub_addr.clone(),
                source,
            });
        }
        Err(_) => return Err(PropagationError::Timeout(config.connect_timeout)),
    };

    if config.tcp_nodelay {
        stream.set_nodelay(true)?;
    }

    tracing::debug!(addr = %config.hub_addr, "Connected to hub");
    Ok(stream)
}
