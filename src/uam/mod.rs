//! UAM gateway integration: launch parameters in, logon request out.

pub mod logon;
pub mod params;
