//! Integration tests against realistic MCP (realm server) message schemas.

use bnet_encoding::{marshal, unmarshal, Decoder, ErrorKind, Message};
use proptest::prelude::*;

mod mcp {
    use bnet_encoding::bnet_message;

    pub const MCP_STARTUP: u8 = 0x01;
    pub const MCP_JOINGAME: u8 = 0x04;
    pub const MCP_GAMEINFO: u8 = 0x06;
    pub const MCP_CHARLOGON: u8 = 0x07;
    pub const MCP_CHARLIST: u8 = 0x17;

    bnet_message! {
        /// Header preceding every MCP message.
        #[derive(Debug, Default, Clone, PartialEq)]
        pub struct Header {
            pub length: u16,
            pub message_id: u8,
        }
    }

    pub mod client {
        use bnet_encoding::bnet_message;

        bnet_message! {
            #[derive(Debug, Default, Clone, PartialEq)]
            pub struct CharLogon {
                pub character_name: String,
            }
        }

        bnet_message! {
            #[derive(Debug, Default, Clone, PartialEq)]
            pub struct Startup {
                pub mcp_cookie: u32,
                pub mcp_status: u32,
                pub chunk1: [u32; 2],
                pub chunk2: [u32; 12],
                pub unique_name: String,
            }
        }

        bnet_message! {
            #[derive(Debug, Default, Clone, PartialEq)]
            pub struct JoinGame {
                pub request_id: u16,
                pub name: String,
                pub password: String,
            }
        }
    }

    pub mod server {
        use bnet_encoding::bnet_message;

        bnet_message! {
            #[derive(Debug, Default, Clone, PartialEq)]
            pub struct CharLogon {
                pub result: u32,
            }
        }

        bnet_message! {
            #[derive(Debug, Default, Clone, PartialEq)]
            pub struct CharListCharacter {
                pub name: String,
                pub statstring: String,
            }
        }

        bnet_message! {
            #[derive(Debug, Default, Clone, PartialEq)]
            pub struct CharList {
                pub request_count: u16,
                pub exist_count: u32,
                pub returned_count: u16 => "save-CLReturned",
                pub characters: Vec<CharListCharacter> => "len-CLReturned",
            }
        }

        bnet_message! {
            #[derive(Debug, Default, Clone, PartialEq)]
            pub struct GameInfo {
                pub request_id: u16,
                pub status: u32,
                pub uptime: u32,
                pub level_restriction_level: u8,
                pub level_restriction_difference: u8,
                pub max_players: u8,
                pub character_count: u8,
                pub character_classes: [u8; 16],
                pub character_levels: [u8; 16],
                pub description: String,
                pub character_names: String,
            }
        }

        bnet_message! {
            #[derive(Debug, Default, Clone, PartialEq)]
            pub struct JoinGame {
                pub request_id: u16,
                pub game_token: u16,
                pub unknown: u16,
                pub game_server_ip: [u8; 4],
                pub game_hash: u32,
                pub result: u32,
            }
        }

        bnet_message! {
            /// A header and a CharLogon response flattened into one message.
            #[derive(Debug, Default, Clone, PartialEq)]
            pub struct FramedCharLogon {
                pub header: super::Header => "embed",
                pub body: CharLogon => "embed",
            }
        }
    }
}

use mcp::{client, server, Header};

bnet_encoding::bnet_message! {
    /// Exercises every supported field kind in one message.
    #[derive(Debug, Default, Clone, PartialEq)]
    struct EveryKind {
        a: u8,
        b: u16,
        c: u32,
        d: u64,
        be16: u16 => "bigendian",
        be32: u32 => "bigendian",
        be64: u64 => "bigendian",
        small: bool => "size-uint8",
        wide: bool => "size-uint32",
        names: Vec<String>,
        count: u16 => "save-EKCount",
        values: Vec<u32> => "len-EKCount,bigendian",
        fixed: [u16; 3],
        label: String,
        trailer: Option<u64>,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_unmarshal_server_charlogon() {
    init_tracing();
    let data = [0x09, 0x00, 0x07, 0x01, 0x00, 0x00, 0x00];

    let mut header = Header::default();
    unmarshal(&data[..3], &mut header).unwrap();
    assert_eq!(header.length, 0x0009);
    assert_eq!(header.message_id, mcp::MCP_CHARLOGON);

    let mut logon = server::CharLogon::default();
    unmarshal(&data[3..], &mut logon).unwrap();
    assert_eq!(logon.result, 1);
}

#[test]
fn test_one_decoder_for_header_and_body() {
    init_tracing();
    let data = [0x09, 0x00, 0x07, 0x01, 0x00, 0x00, 0x00];
    let mut dec = Decoder::new(&data);

    let mut header = Header::default();
    dec.decode(&mut header).unwrap();
    assert_eq!(dec.offset(), 3);

    let mut logon = server::CharLogon::default();
    dec.decode(&mut logon).unwrap();
    assert_eq!(logon.result, 1);
    assert_eq!(dec.remaining(), 0);
}

#[test]
fn test_embedded_header_and_body() {
    init_tracing();
    let descriptor = server::FramedCharLogon::descriptor();
    assert_eq!(
        descriptor.field_names(),
        vec!["length", "message_id", "result"]
    );

    let data = [0x09, 0x00, 0x07, 0x01, 0x00, 0x00, 0x00];
    let mut framed = server::FramedCharLogon::default();
    unmarshal(&data, &mut framed).unwrap();
    assert_eq!(framed.header.length, 9);
    assert_eq!(framed.body.result, 1);

    assert_eq!(&marshal(&framed).unwrap()[..], &data);
}

#[test]
fn test_marshal_client_charlogon() {
    init_tracing();
    let mut buffer = [0u8; 9];

    let header = Header {
        length: 0x09,
        message_id: mcp::MCP_CHARLOGON,
    };
    let data = marshal(&header).unwrap();
    assert_eq!(data.len(), 3);
    buffer[..3].copy_from_slice(&data);

    let logon = client::CharLogon {
        character_name: "Conan\n".to_string(),
    };
    let data = marshal(&logon).unwrap();
    assert_eq!(&data[..], b"Conan\n\0");

    let copied = data.len().min(buffer.len() - 3);
    buffer[3..3 + copied].copy_from_slice(&data[..copied]);
    assert_eq!(buffer, [0x09, 0x00, 0x07, b'C', b'o', b'n', b'a', b'n', b'\n']);
}

#[test]
fn test_charlist_roundtrip() {
    init_tracing();
    let list = server::CharList {
        request_count: 8,
        exist_count: 2,
        returned_count: 2,
        characters: vec![
            server::CharListCharacter {
                name: "Conan".to_string(),
                statstring: "PX2DIablo".to_string(),
            },
            server::CharListCharacter {
                name: "Xena".to_string(),
                statstring: String::new(),
            },
        ],
    };

    let bytes = marshal(&list).unwrap();
    assert_eq!(&bytes[..8], &[8, 0, 2, 0, 0, 0, 2, 0]);

    let mut decoded = server::CharList::default();
    unmarshal(&bytes, &mut decoded).unwrap();
    assert_eq!(decoded, list);
}

#[test]
fn test_charlist_truncated_character() {
    init_tracing();
    // Two characters announced, one and a half present.
    let mut data = vec![8, 0, 2, 0, 0, 0, 2, 0];
    data.extend_from_slice(b"Conan\0stats\0Xena");

    let mut list = server::CharList::default();
    let err = unmarshal(&data, &mut list).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IndexOutOfRange { .. }));
    assert_eq!(err.context.type_name, Some("CharListCharacter"));
    assert_eq!(err.context.field, Some("name"));
    assert_eq!(
        err.context.chain,
        vec!["CharList.characters", "CharListCharacter.name"]
    );
    assert_eq!(err.context.offset, 20);
}

#[test]
fn test_gameinfo_layout() {
    init_tracing();
    let mut info = server::GameInfo {
        request_id: 1,
        status: 4,
        uptime: 60,
        max_players: 8,
        character_count: 1,
        description: "baal run".to_string(),
        character_names: "Conan".to_string(),
        ..Default::default()
    };
    info.character_classes[0] = 3;
    info.character_levels[0] = 99;

    let bytes = marshal(&info).unwrap();
    // 2 + 4 + 4 + 4 * 1 + 16 + 16, then the two strings
    assert_eq!(bytes.len(), 46 + "baal run".len() + 1 + "Conan".len() + 1);
    assert_eq!(bytes[14], 3);
    assert_eq!(bytes[30], 99);

    let mut decoded = server::GameInfo::default();
    unmarshal(&bytes, &mut decoded).unwrap();
    assert_eq!(decoded, info);
}

#[test]
fn test_joingame_response() {
    init_tracing();
    let data = [
        0x02, 0x00, // request id
        0x34, 0x12, // game token
        0x00, 0x00, // unknown
        192, 168, 0, 10, // game server ip
        0xEF, 0xBE, 0xAD, 0xDE, // game hash
        0x00, 0x00, 0x00, 0x00, // result
    ];

    let mut response = server::JoinGame::default();
    unmarshal(&data, &mut response).unwrap();
    assert_eq!(response.request_id, 2);
    assert_eq!(response.game_token, 0x1234);
    assert_eq!(response.game_server_ip, [192, 168, 0, 10]);
    assert_eq!(response.game_hash, 0xDEADBEEF);
    assert_eq!(response.result, 0);
}

#[test]
fn test_joingame_request() {
    init_tracing();
    let request = client::JoinGame {
        request_id: 5,
        name: "cows".to_string(),
        password: String::new(),
    };
    assert_eq!(
        &marshal(&request).unwrap()[..],
        &[0x05, 0x00, b'c', b'o', b'w', b's', 0x00, 0x00]
    );
}

#[test]
fn test_startup_size() {
    init_tracing();
    let startup = client::Startup {
        unique_name: "bnet".to_string(),
        ..Default::default()
    };
    let bytes = marshal(&startup).unwrap();
    assert_eq!(bytes.len(), 4 + 4 + 2 * 4 + 12 * 4 + 5);

    let header = Header {
        length: (bytes.len() + 3) as u16,
        message_id: mcp::MCP_STARTUP,
    };
    assert_eq!(&marshal(&header).unwrap()[..], &[0x48, 0x00, mcp::MCP_STARTUP]);
}

#[test]
fn test_message_ids() {
    assert_eq!(mcp::MCP_JOINGAME, 4);
    assert_eq!(mcp::MCP_GAMEINFO, 6);
    assert_eq!(mcp::MCP_CHARLIST, 0x17);
}

fn wire_string() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .\\-]{0,16}"
}

fn character() -> impl Strategy<Value = server::CharListCharacter> {
    (wire_string(), wire_string())
        .prop_map(|(name, statstring)| server::CharListCharacter { name, statstring })
}

proptest! {
    #[test]
    fn prop_charlist_roundtrip(
        request_count in any::<u16>(),
        exist_count in any::<u32>(),
        characters in prop::collection::vec(character(), 0..8),
    ) {
        let list = server::CharList {
            request_count,
            exist_count,
            returned_count: characters.len() as u16,
            characters,
        };

        let bytes = marshal(&list).unwrap();
        let mut decoded = server::CharList::default();
        unmarshal(&bytes, &mut decoded).unwrap();
        prop_assert_eq!(decoded, list);
    }

    #[test]
    fn prop_startup_roundtrip(
        mcp_cookie in any::<u32>(),
        mcp_status in any::<u32>(),
        chunk1 in any::<[u32; 2]>(),
        chunk2 in any::<[u32; 12]>(),
        unique_name in wire_string(),
    ) {
        let startup = client::Startup { mcp_cookie, mcp_status, chunk1, chunk2, unique_name };

        let bytes = marshal(&startup).unwrap();
        let mut decoded = client::Startup::default();
        unmarshal(&bytes, &mut decoded).unwrap();
        prop_assert_eq!(decoded, startup);
    }

    #[test]
    fn prop_joingame_response_roundtrip(
        request_id in any::<u16>(),
        game_token in any::<u16>(),
        game_server_ip in any::<[u8; 4]>(),
        game_hash in any::<u32>(),
        result in any::<u32>(),
    ) {
        let response = server::JoinGame {
            request_id,
            game_token,
            unknown: 0,
            game_server_ip,
            game_hash,
            result,
        };

        let bytes = marshal(&response).unwrap();
        prop_assert_eq!(bytes.len(), 18);
        let mut decoded = server::JoinGame::default();
        unmarshal(&bytes, &mut decoded).unwrap();
        prop_assert_eq!(decoded, response);
    }

    #[test]
    fn prop_every_kind_roundtrip(
        (a, b, c, d) in (any::<u8>(), any::<u16>(), any::<u32>(), any::<u64>()),
        (be16, be32, be64) in (any::<u16>(), any::<u32>(), any::<u64>()),
        (small, wide) in (any::<bool>(), any::<bool>()),
        names in prop::collection::vec("[a-zA-Z0-9]{1,8}", 0..4),
        values in prop::collection::vec(any::<u32>(), 0..6),
        fixed in any::<[u16; 3]>(),
        label in wire_string(),
        trailer in any::<Option<u64>>(),
    ) {
        let value = EveryKind {
            a, b, c, d,
            be16, be32, be64,
            small, wide,
            names,
            count: values.len() as u16,
            values,
            fixed,
            label,
            trailer,
        };

        let bytes = marshal(&value).unwrap();
        let mut dec = Decoder::new(&bytes);
        let mut decoded = EveryKind::default();
        dec.decode(&mut decoded).unwrap();
        prop_assert_eq!(dec.remaining(), 0);
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn prop_huge_bound_count_is_an_error(count in 1_000u64.., tail in prop::collection::vec(any::<u8>(), 0..8)) {
        bnet_encoding::bnet_message! {
            #[derive(Debug, Default)]
            struct Announced {
                count: u64 => "save-Announced",
                data: Vec<u8> => "len-Announced",
            }
        }

        let mut data = count.to_le_bytes().to_vec();
        data.extend_from_slice(&tail);
        let config = bnet_encoding::CodecConfig::default().with_max_sequence_len(usize::MAX);
        let mut value = Announced::default();
        let err = Decoder::with_config(&data, config).decode(&mut value).unwrap_err();
        prop_assert_eq!(err.code(), "INDEX_OUT_OF_RANGE");
    }

    #[test]
    fn prop_truncated_input_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut list = server::CharList::default();
        let _ = unmarshal(&data, &mut list);
        let mut info = server::GameInfo::default();
        let _ = unmarshal(&data, &mut info);
    }
}
