//! Control-plane command executor for the appliance.
//!
//! Serves administrative commands (upgrade, reboot, network, ntp, syslog)
//! over a local length-prefixed protobuf request/reply channel. Commands
//! may run inline or be forked onto a worker task; forked results are
//! collected through the job registry with claim-once delivery.

pub mod command;
pub mod config;
pub mod process;
pub mod processor;
pub mod transport;
