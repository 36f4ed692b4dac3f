//! Integration-wide constants.

pub const DOMAIN: &str = "naim_muso";
pub const DEFAULT_NAME: &str = "Naim Mu-so speaker";
pub const MANUFACTURER: &str = "Naim Audio";

pub const CONF_HOST: &str = "host";
pub const CONF_DEVICE_ID: &str = "device_id";
pub const CONF_TYPE: &str = "type";
pub const CONF_URL: &str = "url";
pub const CONF_MAC: &str = "mac";
pub const CONF_LISTEN_PORT: &str = "listen_port";
pub const CONF_CALLBACK_URL_OVERRIDE: &str = "callback_url_override";
pub const CONF_POLL_AVAILABILITY: &str = "poll_availability";
pub const CONF_BROWSE_UNFILTERED: &str = "browse_unfiltered";

pub use naim_discovery::UPNP_ST;
