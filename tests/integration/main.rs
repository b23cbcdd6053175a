//! End-to-end tests driving real sessions against a scripted local server.

mod helpers;
mod polling;
mod redirects;
mod shutdown;
