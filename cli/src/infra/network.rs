//! Network infrastructure — implements `PortProbe` using `spawn_blocking`.

use crate::application::ports::PortProbe;

/// Production probe that attempts a real TCP bind on the loopback address.
pub struct TokioPortProbe;

impl PortProbe for TokioPortProbe {
    async fn can_bind(&self, port: u16) -> bool {
        tokio::task::spawn_blocking(move || {
            std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
        })
        .await
        .unwrap_or(false)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bound_port_is_reported_busy() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral");
        let port = listener.local_addr().expect("addr").port();
        assert!(!TokioPortProbe.can_bind(port).await);
        drop(listener);
        assert!(TokioPortProbe.can_bind(port).await);
    }
}
