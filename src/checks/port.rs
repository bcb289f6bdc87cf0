//! TCP/UDP port reachability probe.

use super::elapsed_secs;
use crate::domain::{CheckDetails, CheckOutcome, PortProtocol};
use std::io;
use std::time::{Duration, Instant};
use tokio::net::{TcpStream, UdpSocket};

async fn probe_tcp(host: &str, port: u16) -> io::Result<()> {
    TcpStream::connect((host, port)).await.map(drop)
}

/// UDP is connectionless; this only proves the address resolves and a route exists.
async fn probe_udp(host: &str, port: u16) -> io::Result<()> {
    let target = tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("No address for {}", host)))?;
    let bind = if target.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
    let socket = UdpSocket::bind(bind).await?;
    socket.connect(target).await
}

pub async fn check_port(host: &str, port: u16, protocol: PortProtocol, timeout: Duration) -> CheckOutcome {
    let start = Instant::now();
    let attempt = match protocol {
        PortProtocol::Tcp => tokio::time::timeout(timeout, probe_tcp(host, port)).await,
        PortProtocol::Udp => tokio::time::timeout(timeout, probe_udp(host, port)).await,
    };

    let response_time = Some(elapsed_secs(start));
    let (outcome, open) = match attempt {
        Ok(Ok(())) => (CheckOutcome::up(response_time), true),
        Ok(Err(e)) => (CheckOutcome::down(response_time, e.to_string()), false),
        Err(_) => (CheckOutcome::down(response_time, "Connection timeout"), false),
    };
    outcome.with_details(CheckDetails {
        port_open: Some(open),
        ..Default::default()
    })
}
