use autordp_connector::{Config, Credentials, DesktopSize};
use autordp_pdu::gcc::KeyboardType;
use autordp_pdu::rdp::capability_sets::MajorPlatformType;

const DEFAULT_PORT: u16 = 3389;
const DEFAULT_WIDTH: u16 = 1920;
const DEFAULT_HEIGHT: u16 = 1080;
const CLIENT_BUILD: u32 = 18363;

/// Color depth requested for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorDepth {
    Bpp16,
    #[default]
    Bpp24,
    Bpp32,
}

impl ColorDepth {
    pub fn bits(self) -> u32 {
        match self {
            ColorDepth::Bpp16 => 16,
            ColorDepth::Bpp24 => 24,
            ColorDepth::Bpp32 => 32,
        }
    }
}

/// Connection parameters for one session.
///
/// A config describes exactly one session at a time; connecting consumes a
/// clone, so the same config can be reused for the next session after the
/// previous one is closed.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub domain: Option<String>,
    pub width: u16,
    pub height: u16,
    pub color_depth: ColorDepth,
    /// Render the desktop wallpaper. Off by default: automation rarely wants
    /// the extra bitmap traffic.
    pub wallpaper: bool,
    /// Use fast-path encoding for input when the server supports it.
    pub fast_path_input: bool,
    /// Static virtual channel names to request at MCS level.
    pub static_channels: Vec<String>,
    /// Client machine name presented to the server.
    pub client_name: String,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            domain: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            color_depth: ColorDepth::default(),
            wallpaper: false,
            fast_path_input: true,
            static_channels: Vec::new(),
            client_name: String::from("autordp"),
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_resolution(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_color_depth(mut self, color_depth: ColorDepth) -> Self {
        self.color_depth = color_depth;
        self
    }

    #[must_use]
    pub fn with_wallpaper(mut self, wallpaper: bool) -> Self {
        self.wallpaper = wallpaper;
        self
    }

    #[must_use]
    pub fn with_fast_path_input(mut self, fast_path_input: bool) -> Self {
        self.fast_path_input = fast_path_input;
        self
    }

    pub(crate) fn connector_config(&self) -> Config {
        Config {
            desktop_size: DesktopSize {
                width: self.width,
                height: self.height,
            },
            color_depth: self.color_depth.bits(),
            credentials: Credentials {
                username: self.username.clone(),
                password: self.password.clone(),
                domain: self.domain.clone(),
            },
            autologon: true,
            enable_wallpaper: self.wallpaper,
            enable_fast_path_input: self.fast_path_input,
            static_channels: self.static_channels.clone(),
            client_build: CLIENT_BUILD,
            client_name: self.client_name.clone(),
            keyboard_type: KeyboardType::IbmEnhanced,
            keyboard_subtype: 0,
            keyboard_functional_keys_count: 12,
            ime_file_name: String::new(),
            dig_product_id: String::new(),
            client_dir: String::from("C:\\Windows\\System32\\mstscax.dll"),
            platform: MajorPlatformType::UNIX,
        }
    }
}
