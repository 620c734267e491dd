//! The top-level client connection sequence ([MS-RDPBCGR] 1.3.1.1).

use std::collections::HashMap;
use std::mem;
use std::net::SocketAddr;

use autordp_core::{encode_buf, WriteBuf};
use autordp_pdu::gcc;
use autordp_pdu::mcs;
use autordp_pdu::nego;
use autordp_pdu::rdp::capability_sets::{self, CapabilitySet};
use autordp_pdu::rdp::headers::ShareControlPdu;
use autordp_pdu::rdp::ClientInfoPdu;
use autordp_pdu::x224::X224;
use autordp_pdu::PduHint;

use crate::channel_connection::{ChannelConnectionSequence, ChannelConnectionState};
use crate::connection_finalization::ConnectionFinalizationSequence;
use crate::license_exchange::LicenseExchangeSequence;
use crate::{
    io_channel, Config, ConnectorError, ConnectorErrorExt as _, ConnectorErrorKind, ConnectorResult, DesktopSize,
    Sequence, State, Written,
};

/// Upper bound on the pointer cache slots this client manages.
pub const DEFAULT_POINTER_CACHE_SIZE: u16 = 25;

/// Everything negotiated during the connection sequence that the active
/// session needs.
#[derive(Debug, Clone)]
pub struct ConnectionResult {
    pub io_channel_id: u16,
    pub user_channel_id: u16,
    /// Joined static channels, by requested name.
    pub static_channels: HashMap<String, u16>,
    pub desktop_size: DesktopSize,
    /// Share id assigned by the server, echoed in share control headers.
    pub share_id: u32,
    /// Whether the server accepts fast-path input PDUs.
    pub fastpath_input: bool,
    /// Negotiated number of pointer cache slots.
    pub pointer_cache_size: u16,
}

#[derive(Default, Debug)]
#[non_exhaustive]
pub enum ClientConnectorState {
    #[default]
    Consumed,

    ConnectionInitiationSendRequest,
    ConnectionInitiationWaitConfirm {
        requested_protocol: nego::SecurityProtocol,
    },
    EnhancedSecurityUpgrade {
        selected_protocol: nego::SecurityProtocol,
    },
    Credssp {
        selected_protocol: nego::SecurityProtocol,
    },
    BasicSettingsExchangeSendInitial {
        selected_protocol: nego::SecurityProtocol,
    },
    BasicSettingsExchangeWaitResponse {
        requested_channel_names: Vec<String>,
    },
    ChannelConnection {
        io_channel_id: u16,
        static_channels: HashMap<String, u16>,
        channel_connection: ChannelConnectionSequence,
    },
    SecureSettingsExchange {
        io_channel_id: u16,
        user_channel_id: u16,
        static_channels: HashMap<String, u16>,
    },
    LicensingExchange {
        io_channel_id: u16,
        user_channel_id: u16,
        static_channels: HashMap<String, u16>,
        license_exchange: LicenseExchangeSequence,
    },
    CapabilitiesExchange {
        io_channel_id: u16,
        user_channel_id: u16,
        static_channels: HashMap<String, u16>,
    },
    ConnectionFinalization {
        io_channel_id: u16,
        user_channel_id: u16,
        static_channels: HashMap<String, u16>,
        desktop_size: DesktopSize,
        fastpath_input: bool,
        pointer_cache_size: u16,
        connection_finalization: ConnectionFinalizationSequence,
    },
    Connected {
        result: ConnectionResult,
    },
}

impl State for ClientConnectorState {
    fn name(&self) -> &'static str {
        match self {
            Self::Consumed => "Consumed",
            Self::ConnectionInitiationSendRequest => "ConnectionInitiationSendRequest",
            Self::ConnectionInitiationWaitConfirm { .. } => "ConnectionInitiationWaitConfirm",
            Self::EnhancedSecurityUpgrade { .. } => "EnhancedSecurityUpgrade",
            Self::Credssp { .. } => "Credssp",
            Self::BasicSettingsExchangeSendInitial { .. } => "BasicSettingsExchangeSendInitial",
            Self::BasicSettingsExchangeWaitResponse { .. } => "BasicSettingsExchangeWaitResponse",
            Self::ChannelConnection { .. } => "ChannelConnection",
            Self::SecureSettingsExchange { .. } => "SecureSettingsExchange",
            Self::LicensingExchange { .. } => "LicensingExchange",
            Self::CapabilitiesExchange { .. } => "CapabilitiesExchange",
            Self::ConnectionFinalization { .. } => "ConnectionFinalization",
            Self::Connected { .. } => "Connected",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

#[derive(Debug)]
pub struct ClientConnector {
    pub config: Config,
    pub state: ClientConnectorState,
    pub server_addr: Option<SocketAddr>,
}

impl ClientConnector {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: ClientConnectorState::ConnectionInitiationSendRequest,
            server_addr: None,
        }
    }

    /// Must be set to the actual target server address.
    #[must_use]
    pub fn with_server_addr(mut self, addr: SocketAddr) -> Self {
        self.server_addr = Some(addr);
        self
    }

    pub fn should_perform_security_upgrade(&self) -> bool {
        matches!(self.state, ClientConnectorState::EnhancedSecurityUpgrade { .. })
    }

    pub fn mark_security_upgrade_as_done(&mut self) {
        assert!(self.should_perform_security_upgrade());
        self.step_no_input(&mut WriteBuf::new()).expect("transition to next state");
        debug_assert!(!self.should_perform_security_upgrade());
    }

    pub fn should_perform_credssp(&self) -> bool {
        matches!(self.state, ClientConnectorState::Credssp { .. })
    }

    pub fn mark_credssp_as_done(&mut self) {
        assert!(self.should_perform_credssp());
        let res = self.step_no_input(&mut WriteBuf::new()).expect("transition to next state");
        debug_assert!(!self.should_perform_credssp());
        assert_eq!(res, Written::Nothing);
    }
}

impl Sequence for ClientConnector {
    fn next_pdu_hint(&self) -> Option<&dyn PduHint> {
        match &self.state {
            ClientConnectorState::Consumed => None,
            ClientConnectorState::ConnectionInitiationSendRequest => None,
            ClientConnectorState::ConnectionInitiationWaitConfirm { .. } => Some(&autordp_pdu::X224_HINT),
            ClientConnectorState::EnhancedSecurityUpgrade { .. } => None,
            ClientConnectorState::Credssp { .. } => None,
            ClientConnectorState::BasicSettingsExchangeSendInitial { .. } => None,
            ClientConnectorState::BasicSettingsExchangeWaitResponse { .. } => Some(&autordp_pdu::X224_HINT),
            ClientConnectorState::ChannelConnection { channel_connection, .. } => channel_connection.next_pdu_hint(),
            ClientConnectorState::SecureSettingsExchange { .. } => None,
            ClientConnectorState::LicensingExchange { license_exchange, .. } => license_exchange.next_pdu_hint(),
            ClientConnectorState::CapabilitiesExchange { .. } => Some(&autordp_pdu::X224_HINT),
            ClientConnectorState::ConnectionFinalization {
                connection_finalization,
                ..
            } => connection_finalization.next_pdu_hint(),
            ClientConnectorState::Connected { .. } => None,
        }
    }

    fn state(&self) -> &dyn State {
        &self.state
    }

    fn step(&mut self, input: &[u8], output: &mut WriteBuf) -> ConnectorResult<Written> {
        let (written, next_state) = match mem::take(&mut self.state) {
            ClientConnectorState::Consumed => {
                return Err(general_err!("connector sequence state is consumed (this is a bug)"))
            }

            //== Connection Initiation ==//
            // Exchange the supported security protocols.
            ClientConnectorState::ConnectionInitiationSendRequest => {
                debug!("Connection Initiation");

                // CredSSP implies TLS; only the hybrid protocol is offered so
                // the server cannot downgrade NLA to plain TLS.
                let security_protocol = nego::SecurityProtocol::HYBRID;

                let connection_request = nego::ConnectionRequest {
                    nego_data: Some(nego::NegoRequestData::cookie(
                        self.config.credentials.username.clone(),
                    )),
                    flags: nego::RequestFlags::empty(),
                    protocol: security_protocol,
                };

                debug!(message = ?connection_request, "Send");

                let written = encode_buf(&X224(connection_request), output).map_err(ConnectorError::encode)?;

                (
                    Written::from_size(written)?,
                    ClientConnectorState::ConnectionInitiationWaitConfirm {
                        requested_protocol: security_protocol,
                    },
                )
            }
            ClientConnectorState::ConnectionInitiationWaitConfirm { requested_protocol } => {
                let connection_confirm: X224<nego::ConnectionConfirm> =
                    autordp_core::decode(input).map_err(ConnectorError::decode)?;

                debug!(message = ?connection_confirm.0, "Received");

                let (flags, selected_protocol) = match connection_confirm.0 {
                    nego::ConnectionConfirm::Response { flags, protocol } => (flags, protocol),
                    nego::ConnectionConfirm::Failure { code } => {
                        error!(?code, "Received connection failure code");
                        return Err(reason_err!("Initiation", "{code}"));
                    }
                };

                info!(?selected_protocol, ?flags, "Server confirmed connection");

                if !selected_protocol.intersects(requested_protocol) {
                    return Err(reason_err!(
                        "Initiation",
                        "client advertised {requested_protocol:?}, but server selected {selected_protocol:?}"
                    ));
                }

                (
                    Written::Nothing,
                    ClientConnectorState::EnhancedSecurityUpgrade { selected_protocol },
                )
            }

            //== Upgrade to Enhanced RDP Security ==//
            // The transport driver performs the TLS handshake at this point.
            ClientConnectorState::EnhancedSecurityUpgrade { selected_protocol } => {
                debug!("Begin NLA using CredSSP");
                (Written::Nothing, ClientConnectorState::Credssp { selected_protocol })
            }

            //== CredSSP ==//
            // Driven externally over the upgraded transport.
            ClientConnectorState::Credssp { selected_protocol } => (
                Written::Nothing,
                ClientConnectorState::BasicSettingsExchangeSendInitial { selected_protocol },
            ),

            //== Basic Settings Exchange ==//
            // Core, security and network settings blocks inside an MCS
            // Connect Initial.
            ClientConnectorState::BasicSettingsExchangeSendInitial { selected_protocol } => {
                debug!("Basic Settings Exchange");

                let client_gcc_blocks = create_gcc_blocks(&self.config, selected_protocol)?;

                let connect_initial = mcs::ConnectInitial::with_gcc_blocks(client_gcc_blocks);

                debug!(message = ?connect_initial, "Send");

                let written = io_channel::encode_x224_packet(&connect_initial, output)?;

                let requested_channel_names = self.config.static_channels.clone();

                (
                    Written::from_size(written)?,
                    ClientConnectorState::BasicSettingsExchangeWaitResponse { requested_channel_names },
                )
            }
            ClientConnectorState::BasicSettingsExchangeWaitResponse { requested_channel_names } => {
                let connect_response: mcs::ConnectResponse = io_channel::decode_x224_packet(input)?;

                debug!(message = ?connect_response, "Received");

                let server_gcc_blocks = &connect_response.conference_create_response.gcc_blocks;

                if server_gcc_blocks.security != gcc::ServerSecurityData::no_security() {
                    // Standard RDP security is encryption below TLS, which
                    // this client never negotiates.
                    // Surfaced as a capability failure: the server insists on
                    // a security mechanism this client does not implement.
                    return Err(ConnectorError::new("BasicSettingsExchange", ConnectorErrorKind::Capability));
                }

                let io_channel_id = server_gcc_blocks.io_channel_id();
                let static_channel_ids = server_gcc_blocks.channel_ids();

                debug!(?static_channel_ids, io_channel_id);

                let static_channels: HashMap<String, u16> = requested_channel_names
                    .into_iter()
                    .zip(static_channel_ids.iter().copied())
                    .collect();

                (
                    Written::Nothing,
                    ClientConnectorState::ChannelConnection {
                        io_channel_id,
                        static_channels,
                        channel_connection: ChannelConnectionSequence::new(io_channel_id, static_channel_ids),
                    },
                )
            }

            //== Channel Connection ==//
            // Join every individual channel.
            ClientConnectorState::ChannelConnection {
                io_channel_id,
                static_channels,
                mut channel_connection,
            } => {
                debug!("Channel Connection");
                let written = channel_connection.step(input, output)?;

                let next_state = if let ChannelConnectionState::AllJoined { user_channel_id } = channel_connection.state
                {
                    debug_assert!(channel_connection.state.is_terminal());

                    ClientConnectorState::SecureSettingsExchange {
                        io_channel_id,
                        user_channel_id,
                        static_channels,
                    }
                } else {
                    ClientConnectorState::ChannelConnection {
                        io_channel_id,
                        static_channels,
                        channel_connection,
                    }
                };

                (written, next_state)
            }

            //== Secure Settings Exchange ==//
            // Send the Client Info PDU (credentials, locale, performance
            // flags, time zone).
            ClientConnectorState::SecureSettingsExchange {
                io_channel_id,
                user_channel_id,
                static_channels,
            } => {
                debug!("Secure Settings Exchange");

                let routing_addr = self
                    .server_addr
                    .as_ref()
                    .ok_or_else(|| general_err!("server address is missing"))?;

                let client_info = create_client_info_pdu(&self.config, routing_addr);

                debug!(message = ?client_info, "Send");

                let written = io_channel::encode_send_data_request(user_channel_id, io_channel_id, &client_info, output)?;

                (
                    Written::from_size(written)?,
                    ClientConnectorState::LicensingExchange {
                        io_channel_id,
                        user_channel_id,
                        static_channels,
                        license_exchange: LicenseExchangeSequence::new(io_channel_id),
                    },
                )
            }

            //== Licensing ==//
            ClientConnectorState::LicensingExchange {
                io_channel_id,
                user_channel_id,
                static_channels,
                mut license_exchange,
            } => {
                debug!("Licensing Exchange");

                let written = license_exchange.step(input, output)?;

                let next_state = if license_exchange.state.is_terminal() {
                    ClientConnectorState::CapabilitiesExchange {
                        io_channel_id,
                        user_channel_id,
                        static_channels,
                    }
                } else {
                    ClientConnectorState::LicensingExchange {
                        io_channel_id,
                        user_channel_id,
                        static_channels,
                        license_exchange,
                    }
                };

                (written, next_state)
            }

            //== Capabilities Exchange ==//
            // The server demands activation with its capability sets; the
            // client confirms with its own.
            ClientConnectorState::CapabilitiesExchange {
                io_channel_id,
                user_channel_id,
                static_channels,
            } => {
                debug!("Capabilities Exchange");

                let send_data_indication_ctx = io_channel::decode_send_data_indication(input)?;
                let share_control_ctx = io_channel::decode_share_control(send_data_indication_ctx)?;

                debug!(message = ?share_control_ctx.pdu, "Received");

                if share_control_ctx.channel_id != io_channel_id {
                    warn!(
                        io_channel_id,
                        share_control_ctx.channel_id, "Unexpected channel ID for received Share Control PDU"
                    );
                }

                let ShareControlPdu::ServerDemandActive(server_demand_active) = share_control_ctx.pdu else {
                    return Err(general_err!("unexpected Share Control PDU (expected ServerDemandActive)"));
                };

                let capability_sets = server_demand_active.pdu.capability_sets;

                for set in &capability_sets {
                    if let CapabilitySet::General(general) = set {
                        if !general
                            .extra_flags
                            .contains(capability_sets::GeneralExtraFlags::FASTPATH_OUTPUT_SUPPORTED)
                        {
                            debug!("Server does not support fast-path output");
                        }
                        break;
                    }
                }

                let desktop_size = capability_sets
                    .iter()
                    .find_map(|set| match set {
                        CapabilitySet::Bitmap(bitmap) => Some(DesktopSize {
                            width: bitmap.desktop_width,
                            height: bitmap.desktop_height,
                        }),
                        _ => None,
                    })
                    .unwrap_or(self.config.desktop_size);

                let fastpath_input = capability_sets
                    .iter()
                    .find_map(|set| match set {
                        CapabilitySet::Input(input) => Some(input.input_flags.supports_fast_path_input()),
                        _ => None,
                    })
                    .ok_or_else(|| general_err!("server did not advertise an input capability set"))?;

                let pointer_cache_size = capability_sets
                    .iter()
                    .find_map(|set| match set {
                        CapabilitySet::Pointer(pointer) => Some(pointer.color_pointer_cache_size),
                        _ => None,
                    })
                    .unwrap_or(DEFAULT_POINTER_CACHE_SIZE)
                    .min(DEFAULT_POINTER_CACHE_SIZE);

                let client_confirm_active = ShareControlPdu::ClientConfirmActive(create_client_confirm_active(
                    &self.config,
                    share_control_ctx.pdu_source,
                    capability_sets,
                ));

                debug!(message = ?client_confirm_active, "Send");

                let written = io_channel::encode_share_control(
                    user_channel_id,
                    io_channel_id,
                    share_control_ctx.share_id,
                    client_confirm_active,
                    output,
                )?;

                (
                    Written::from_size(written)?,
                    ClientConnectorState::ConnectionFinalization {
                        io_channel_id,
                        user_channel_id,
                        static_channels,
                        desktop_size,
                        fastpath_input,
                        pointer_cache_size,
                        connection_finalization: ConnectionFinalizationSequence::new(
                            io_channel_id,
                            user_channel_id,
                            share_control_ctx.share_id,
                        ),
                    },
                )
            }

            //== Connection Finalization ==//
            ClientConnectorState::ConnectionFinalization {
                io_channel_id,
                user_channel_id,
                static_channels,
                desktop_size,
                fastpath_input,
                pointer_cache_size,
                mut connection_finalization,
            } => {
                debug!("Connection Finalization");

                let written = connection_finalization.step(input, output)?;

                let next_state = if connection_finalization.state.is_terminal() {
                    ClientConnectorState::Connected {
                        result: ConnectionResult {
                            io_channel_id,
                            user_channel_id,
                            static_channels,
                            desktop_size,
                            share_id: connection_finalization.share_id,
                            fastpath_input,
                            pointer_cache_size,
                        },
                    }
                } else {
                    ClientConnectorState::ConnectionFinalization {
                        io_channel_id,
                        user_channel_id,
                        static_channels,
                        desktop_size,
                        fastpath_input,
                        pointer_cache_size,
                        connection_finalization,
                    }
                };

                (written, next_state)
            }

            //== Connected ==//
            ClientConnectorState::Connected { .. } => return Err(general_err!("already connected")),
        };

        self.state = next_state;

        Ok(written)
    }
}

fn create_gcc_blocks(config: &Config, selected_protocol: nego::SecurityProtocol) -> ConnectorResult<gcc::ClientGccBlocks> {
    use autordp_pdu::gcc::*;

    let supported_color_depths = match config.color_depth {
        16 => SupportedColorDepths::BPP16,
        24 => SupportedColorDepths::BPP24,
        32 => SupportedColorDepths::BPP32 | SupportedColorDepths::BPP24 | SupportedColorDepths::BPP16,
        _ => return Err(reason_err!("GCC", "unsupported color depth: {}", config.color_depth)),
    };

    let mut early_capability_flags =
        ClientEarlyCapabilityFlags::VALID_CONNECTION_TYPE | ClientEarlyCapabilityFlags::SUPPORT_ERR_INFO_PDU;

    if config.color_depth == 32 {
        early_capability_flags |= ClientEarlyCapabilityFlags::WANT_32_BPP_SESSION;
    }

    let channels: Vec<ChannelDef> = config
        .static_channels
        .iter()
        .filter_map(|name| {
            let channel_name = ChannelName::from_utf8(name);
            if channel_name.is_none() {
                warn!(%name, "Skipping an invalid static channel name");
            }
            channel_name
        })
        .map(|name| ChannelDef {
            name,
            options: ChannelOptions::INITIALIZED | ChannelOptions::COMPRESS_RDP,
        })
        .collect();

    Ok(ClientGccBlocks {
        core: ClientCoreData {
            version: RdpVersion::V5_PLUS,
            desktop_width: config.desktop_size.width,
            desktop_height: config.desktop_size.height,
            // The server should use the default active input locale.
            keyboard_layout: 0,
            client_build: config.client_build,
            client_name: config.client_name.clone(),
            keyboard_type: config.keyboard_type,
            keyboard_subtype: config.keyboard_subtype,
            keyboard_functional_keys_count: config.keyboard_functional_keys_count,
            ime_file_name: config.ime_file_name.clone(),
            high_color_depth: HighColorDepth::Bpp24,
            supported_color_depths,
            early_capability_flags,
            dig_product_id: config.dig_product_id.clone(),
            connection_type: ConnectionType::Lan,
            server_selected_protocol: selected_protocol,
        },
        security: ClientSecurityData::no_security(),
        network: if channels.is_empty() {
            None
        } else {
            Some(ClientNetworkData { channels })
        },
    })
}

fn create_client_info_pdu(config: &Config, routing_addr: &SocketAddr) -> ClientInfoPdu {
    use autordp_pdu::rdp::client_info::{
        AddressFamily, ClientInfo, ClientInfoFlags, CompressionType, Credentials, ExtendedClientInfo,
        ExtendedClientOptionalInfo, PerformanceFlags, TimezoneInfo,
    };
    use autordp_pdu::rdp::headers::{BasicSecurityHeader, BasicSecurityHeaderFlags};

    let security_header = BasicSecurityHeader {
        flags: BasicSecurityHeaderFlags::INFO_PKT,
    };

    let mut flags = ClientInfoFlags::UNICODE
        | ClientInfoFlags::MOUSE
        | ClientInfoFlags::MOUSE_HAS_WHEEL
        | ClientInfoFlags::DISABLE_CTRL_ALT_DEL
        | ClientInfoFlags::LOGON_NOTIFY
        | ClientInfoFlags::LOGON_ERRORS
        | ClientInfoFlags::NO_AUDIO_PLAYBACK
        | ClientInfoFlags::VIDEO_DISABLE
        | ClientInfoFlags::ENABLE_WINDOWS_KEY;

    if config.autologon {
        flags |= ClientInfoFlags::AUTOLOGON;
    }

    let mut performance_flags = PerformanceFlags::DISABLE_MENUANIMATIONS | PerformanceFlags::DISABLE_FULLWINDOWDRAG;

    if !config.enable_wallpaper {
        performance_flags |= PerformanceFlags::DISABLE_WALLPAPER;
    }

    let client_info = ClientInfo {
        credentials: Credentials {
            username: config.credentials.username.clone(),
            password: config.credentials.password.clone(),
            domain: config.credentials.domain.clone(),
        },
        // Ignored when the keyboard layout of the core data is zero.
        code_page: 0,
        flags,
        compression_type: CompressionType::K8, // ignored without the COMPRESSION flag
        alternate_shell: String::new(),
        work_dir: String::new(),
        extra_info: ExtendedClientInfo {
            address_family: match routing_addr {
                SocketAddr::V4(_) => AddressFamily::INet,
                SocketAddr::V6(_) => AddressFamily::INet6,
            },
            address: routing_addr.ip().to_string(),
            dir: config.client_dir.clone(),
            optional_data: ExtendedClientOptionalInfo {
                timezone: Some(TimezoneInfo::utc()),
                session_id: Some(0),
                performance_flags: Some(performance_flags),
            },
        },
    };

    ClientInfoPdu {
        security_header,
        client_info,
    }
}

fn create_client_confirm_active(
    config: &Config,
    originator_id: u16,
    server_capability_sets: Vec<CapabilitySet>,
) -> capability_sets::ClientConfirmActive {
    use autordp_pdu::rdp::capability_sets::*;

    let max_request_size = server_capability_sets
        .iter()
        .find_map(|set| match set {
            CapabilitySet::MultiFragmentUpdate(mfu) => Some(mfu.max_request_size),
            _ => None,
        })
        .unwrap_or(1024);

    let mut input_flags = InputFlags::SCANCODES | InputFlags::UNICODE | InputFlags::MOUSEX;

    if config.enable_fast_path_input {
        input_flags |= InputFlags::FASTPATH_INPUT | InputFlags::FASTPATH_INPUT_2;
    }

    let capability_sets = vec![
        CapabilitySet::General(General {
            major_platform_type: config.platform,
            minor_platform_type: MinorPlatformType::UNSPECIFIED,
            extra_flags: GeneralExtraFlags::FASTPATH_OUTPUT_SUPPORTED | GeneralExtraFlags::NO_BITMAP_COMPRESSION_HDR,
            refresh_rect_support: false,
            suppress_output_support: false,
        }),
        CapabilitySet::Bitmap(Bitmap {
            pref_bits_per_pix: config.color_depth as u16,
            desktop_width: config.desktop_size.width,
            desktop_height: config.desktop_size.height,
            desktop_resize_flag: false,
            drawing_flags: BitmapDrawingFlags::ALLOW_SKIP_ALPHA,
        }),
        CapabilitySet::Order(Order::new(
            OrderFlags::NEGOTIATE_ORDER_SUPPORT | OrderFlags::ZERO_BOUNDS_DELTAS_SUPPORT,
            OrderSupportExFlags::empty(),
            0,
            0,
        )),
        CapabilitySet::BitmapCache(BitmapCache {
            caches: [CacheEntry {
                entries: 0,
                max_cell_size: 0,
            }; BITMAP_CACHE_ENTRIES_NUM],
        }),
        CapabilitySet::Input(Input {
            input_flags,
            keyboard_layout: 0,
            keyboard_type: config.keyboard_type as u32,
            keyboard_subtype: config.keyboard_subtype,
            keyboard_function_key: config.keyboard_functional_keys_count,
            keyboard_ime_filename: config.ime_file_name.clone(),
        }),
        // A non-zero pointer cache enables client-side pointer handling.
        CapabilitySet::Pointer(Pointer {
            color_pointer_cache_size: DEFAULT_POINTER_CACHE_SIZE,
            pointer_cache_size: DEFAULT_POINTER_CACHE_SIZE,
        }),
        CapabilitySet::Brush(Brush {
            support_level: BrushSupportLevel::Default,
        }),
        CapabilitySet::GlyphCache(GlyphCache {
            glyph_cache: [CacheDefinition {
                entries: 0,
                max_cell_size: 0,
            }; GLYPH_CACHE_NUM],
            frag_cache: CacheDefinition {
                entries: 0,
                max_cell_size: 0,
            },
            glyph_support_level: GlyphSupportLevel::None,
        }),
        CapabilitySet::OffscreenBitmapCache(OffscreenBitmapCache {
            is_supported: false,
            cache_size: 0,
            cache_entries: 0,
        }),
        CapabilitySet::VirtualChannel(VirtualChannel {
            flags: VirtualChannelFlags::NO_COMPRESSION,
            chunk_size: Some(0), // ignored
        }),
        CapabilitySet::Sound(Sound {
            flags: SoundFlags::empty(),
        }),
        CapabilitySet::Font(Font {
            flags: FontSupportFlags::FONTSUPPORT_FONTLIST,
        }),
        // UP_TO_384X384_PIXELS permits large pointer updates, required for
        // cursors bigger than 96×96.
        CapabilitySet::LargePointer(LargePointer {
            flags: LargePointerSupportFlags::UP_TO_384X384_PIXELS,
        }),
        CapabilitySet::MultiFragmentUpdate(MultifragmentUpdate { max_request_size }),
    ];

    ClientConfirmActive {
        originator_id,
        pdu: DemandActive {
            source_descriptor: String::from("AUTORDP"),
            capability_sets,
        },
    }
}
