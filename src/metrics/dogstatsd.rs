//! DogStatsD client backed by `cadence`.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::panic::RefUnwindSafe;

use cadence::prelude::*;
use cadence::{Metric, MetricBuilder, MetricSink, QueuingMetricSink, StatsdClient, UdpMetricSink};
use tracing::info;

use super::client::MetricsClient;
use crate::config::DogStatsdConfig;
use crate::error::MetricsError;

/// Sends metrics through a `cadence` client. Tags are passed through as
/// plain tag values, so `key:value` strings arrive unchanged.
pub struct DogStatsdClient {
    client: StatsdClient,
}

impl DogStatsdClient {
    /// Resolves the collector address and binds a non-blocking local socket.
    /// Metrics are queued, up to `buffer_size`, for a background sender
    /// thread; a full queue rejects new metrics instead of blocking.
    pub fn connect(host: &str, port: u16, buffer_size: usize) -> Result<Self, MetricsError> {
        let target = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
            MetricsError::Rejected(format!("could not resolve collector host '{}'", host))
        })?;

        let local = if target.is_ipv6() {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;

        let udp = UdpMetricSink::from(target, socket)?;
        let sink = QueuingMetricSink::with_capacity(udp, buffer_size.max(1));

        info!("Sending DogStatsD metrics to {}", target);
        Ok(Self::from_sink(sink))
    }

    /// Builds a client from the `dogstatsd` configuration section.
    pub fn from_config(config: &DogStatsdConfig) -> Result<Self, MetricsError> {
        Self::connect(&config.host, config.port, config.buffer_size)
    }

    /// Client over any `cadence` sink. Names are sent exactly as given.
    pub fn from_sink<T>(sink: T) -> Self
    where
        T: MetricSink + Send + Sync + RefUnwindSafe + 'static,
    {
        DogStatsdClient {
            client: StatsdClient::from_sink("", sink),
        }
    }
}

impl MetricsClient for DogStatsdClient {
    fn timing(&self, name: &str, millis: u64, tags: &[String]) -> Result<(), MetricsError> {
        send_tagged(self.client.time_with_tags(name, millis), tags)
    }

    fn increment(&self, name: &str, amount: i64, tags: &[String]) -> Result<(), MetricsError> {
        send_tagged(self.client.count_with_tags(name, amount), tags)
    }
}

fn send_tagged<'m, 'c, T>(builder: MetricBuilder<'m, 'c, T>, tags: &'m [String]) -> Result<(), MetricsError>
where
    T: Metric + From<String>,
{
    tags.iter()
        .fold(builder, |builder, tag| builder.with_tag_value(tag))
        .try_send()?;
    Ok(())
}
