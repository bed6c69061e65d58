//! The portal auth flow: states, credentials, controller.

pub mod controller;
pub mod credentials;
pub mod state;
