//! This crate describes the json api of the remote lab server.
//! The canonical server implementation lives in the same repository.
//!
//! The lab exposes two experiments to a browser:
//! running a snippet of python and timing it, and reading a DHT11
//! temperature/humidity sensor attached to the host.
//!
//! ## Usage
//! For the complete usage, see the serde structs in [`api`].
//! * `GET /`, `/computational_lab`, `/temperature_lab` return static html pages.
//! * `POST /execute_computational` runs [`api::ExecuteRequest::code`] and
//!   answers with an [`api::ExecuteResponse`].
//! * `GET /get_temperature` reads the sensor once and answers with an
//!   [`api::TemperatureResponse`].
//!
//! ## Errors
//! Failures are never signalled by the http status, which is always `200 OK`.
//! Check which variant the json body deserializes into instead.
//!
//! ## Security
//! The api does not include any security measures, this is *remote execution as a service!*.
//! Make sure it is only reachable from trusted hosts. E.g. by means of ssh port forwarding.

pub mod api;
