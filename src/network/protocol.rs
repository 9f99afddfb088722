// src/network/protocol.rs
//! Pool session wire format
//!
//! Every frame is a JSON array whose first element is a one-character
//! opcode. Integers that can grow large (nonces, difficulty, workload
//! counts) travel as base36 strings; byte buffers travel as hex.
//!
//! | Message | Frame |
//! |---|---|
//! | register | `["r", address, name, version, platform, pull, commit]` |
//! | register result | `["b", code]` with code `c`/`b`/`a`/`d`/`e` |
//! | job assign | `["j", header_hex, difficulty36, token, base_nonce36]` |
//! | pull | `["p"]` |
//! | pull result | `["a", token, base_nonce36]` |
//! | push full | `["u"]` |
//! | push partial | `["t", workloads36]` |
//! | submit share | `["s", token, nonce36, hash_hex]` |

use crate::types::{Job, from_base36, to_base36};
use crate::utils::error::MinerError;
use serde_json::{Value, json};

/// Registration payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Payout address
    pub address: String,
    /// Name shown on the pool dashboard
    pub display_name: String,
    /// Protocol version spoken by this client
    pub protocol_version: u32,
    /// Free-form platform description
    pub platform: String,
    /// Units requested per pull
    pub pull_workloads: u64,
    /// Units per full commit
    pub commit_workloads: u64,
}

/// Messages sent to the pool server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Announce this miner
    Register(Registration),
    /// Ask for more workload
    Pull,
    /// Report a full commit of mined units
    PushFull,
    /// Report a partial number of mined units
    PushPartial {
        /// Units mined since the last push
        workloads: u64,
    },
    /// Submit a found share
    SubmitShare {
        /// Job the share belongs to
        job_token: String,
        /// Winning nonce
        nonce: u64,
        /// Resulting hash
        hash: [u8; 32],
    },
}

/// Server answer to a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Miner accepted
    Accepted,
    /// Registration rejected
    RegisterFailed,
    /// Server cannot take miners right now
    ServerUnable,
    /// No free slot
    ServerFull,
    /// Protocol version rejected
    VersionTooOld,
    /// Code this client does not know
    Unknown,
}

impl RegisterOutcome {
    /// Maps a wire sub-code to an outcome
    pub fn from_code(code: &str) -> Self {
        match code {
            "c" => RegisterOutcome::Accepted,
            "b" => RegisterOutcome::RegisterFailed,
            "a" => RegisterOutcome::ServerUnable,
            "d" => RegisterOutcome::ServerFull,
            "e" => RegisterOutcome::VersionTooOld,
            _ => RegisterOutcome::Unknown,
        }
    }
}

/// Messages received from the pool server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Answer to our registration
    RegisterResult(RegisterOutcome),
    /// New job, superseding the previous one
    JobAssign(Job),
    /// Answer to a pull
    PullResult {
        /// Job the new units belong to
        job_token: String,
        /// First nonce of the new batch
        base_nonce: u64,
    },
}

impl ClientMessage {
    /// Serializes the message into a text frame
    pub fn encode(&self) -> String {
        let value = match self {
            ClientMessage::Register(reg) => json!([
                "r",
                reg.address,
                reg.display_name,
                reg.protocol_version,
                reg.platform,
                reg.pull_workloads,
                reg.commit_workloads
            ]),
            ClientMessage::Pull => json!(["p"]),
            ClientMessage::PushFull => json!(["u"]),
            ClientMessage::PushPartial { workloads } => json!(["t", to_base36(*workloads)]),
            ClientMessage::SubmitShare {
                job_token,
                nonce,
                hash,
            } => json!(["s", job_token, to_base36(*nonce), hex::encode(hash)]),
        };
        value.to_string()
    }
}

impl ServerMessage {
    /// Parses a text frame received from the server
    ///
    /// # Errors
    /// Returns `MinerError::ProtocolError` for unknown opcodes or missing
    /// fields, `MinerError::JsonError` when the frame is not JSON.
    pub fn decode(frame: &str) -> Result<Self, MinerError> {
        let value: Value = serde_json::from_str(frame)?;
        let fields = value
            .as_array()
            .ok_or_else(|| MinerError::ProtocolError("Frame is not an array".to_string()))?;
        let opcode = str_field(fields, 0, "opcode")?;

        match opcode {
            "b" => Ok(ServerMessage::RegisterResult(RegisterOutcome::from_code(
                str_field(fields, 1, "register code")?,
            ))),
            "j" => Ok(ServerMessage::JobAssign(Job {
                header: hex::decode(str_field(fields, 1, "header")?)?,
                difficulty: u32::try_from(base36_field(fields, 2, "difficulty")?).map_err(
                    |_| MinerError::ProtocolError("Difficulty does not fit 32 bits".to_string()),
                )?,
                token: str_field(fields, 3, "job token")?.to_string(),
                base_nonce: base36_field(fields, 4, "base nonce")?,
            })),
            "a" => Ok(ServerMessage::PullResult {
                job_token: str_field(fields, 1, "job token")?.to_string(),
                base_nonce: base36_field(fields, 2, "base nonce")?,
            }),
            other => Err(MinerError::ProtocolError(format!(
                "Unknown opcode '{}'",
                other
            ))),
        }
    }
}

fn str_field<'a>(fields: &'a [Value], idx: usize, name: &str) -> Result<&'a str, MinerError> {
    fields
        .get(idx)
        .and_then(|v| v.as_str())
        .ok_or_else(|| MinerError::ProtocolError(format!("Missing {}", name)))
}

fn base36_field(fields: &[Value], idx: usize, name: &str) -> Result<u64, MinerError> {
    let raw = str_field(fields, idx, name)?;
    from_base36(raw)
        .ok_or_else(|| MinerError::ProtocolError(format!("Invalid base36 {}: '{}'", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn decodes_job_assignment() {
        let msg = ServerMessage::decode(r#"["j","00ff10","t9ix0f","tok-1","sg"]"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::JobAssign(Job {
                header: hex!("00ff10").to_vec(),
                difficulty: u32::from_str_radix("t9ix0f", 36).unwrap(),
                token: "tok-1".into(),
                base_nonce: 1024,
            })
        );
    }

    #[test]
    fn decodes_register_codes() {
        let code = |c: &str| match ServerMessage::decode(&format!(r#"["b","{}"]"#, c)).unwrap() {
            ServerMessage::RegisterResult(o) => o,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(code("c"), RegisterOutcome::Accepted);
        assert_eq!(code("b"), RegisterOutcome::RegisterFailed);
        assert_eq!(code("a"), RegisterOutcome::ServerUnable);
        assert_eq!(code("d"), RegisterOutcome::ServerFull);
        assert_eq!(code("e"), RegisterOutcome::VersionTooOld);
        assert_eq!(code("zz"), RegisterOutcome::Unknown);
    }

    #[test]
    fn decodes_pull_result() {
        assert_eq!(
            ServerMessage::decode(r#"["a","tok","10"]"#).unwrap(),
            ServerMessage::PullResult {
                job_token: "tok".into(),
                base_nonce: 36,
            }
        );
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(
            ServerMessage::decode("not json"),
            Err(MinerError::JsonError(_))
        ));
        assert!(matches!(
            ServerMessage::decode(r#"{"j":1}"#),
            Err(MinerError::ProtocolError(_))
        ));
        assert!(matches!(
            ServerMessage::decode(r#"["x"]"#),
            Err(MinerError::ProtocolError(_))
        ));
        assert!(matches!(
            ServerMessage::decode(r#"["a","tok"]"#),
            Err(MinerError::ProtocolError(_))
        ));
        assert!(matches!(
            ServerMessage::decode(r#"["j","zz","1","t","0"]"#),
            Err(MinerError::InputError(_))
        ));
    }

    #[test]
    fn encodes_client_messages() {
        assert_eq!(ClientMessage::Pull.encode(), r#"["p"]"#);
        assert_eq!(ClientMessage::PushFull.encode(), r#"["u"]"#);
        assert_eq!(
            ClientMessage::PushPartial { workloads: 36 }.encode(),
            r#"["t","10"]"#
        );

        let share = ClientMessage::SubmitShare {
            job_token: "tok".into(),
            nonce: 1500,
            hash: [0xab; 32],
        };
        assert_eq!(
            share.encode(),
            format!(r#"["s","tok","15o","{}"]"#, "ab".repeat(32))
        );

        let reg = ClientMessage::Register(Registration {
            address: "addr".into(),
            display_name: "rig".into(),
            protocol_version: 1,
            platform: "linux".into(),
            pull_workloads: 40,
            commit_workloads: 20,
        });
        assert_eq!(reg.encode(), r#"["r","addr","rig",1,"linux",40,20]"#);
    }
}
