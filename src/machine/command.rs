use crate::util::errors::{NodeError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// A command carried in a committed log entry's payload. Payloads are
/// `|`-separated UTF-8 text with the command tag in the first field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// STORE_FILE|name|checksum|size|base64Content
    /// Checksum and size travel with the command but are not re-validated.
    StoreFile {
        name: String,
        checksum: String,
        size: String,
        content: Vec<u8>,
    },
    /// REGISTER_MODEL|modelId|type|accuracy|timestamp
    RegisterModel {
        model_id: String,
        model_type: String,
        accuracy: String,
        timestamp: String,
    },
    /// DELETE_FILE|name
    DeleteFile { name: String },
    /// NOP
    Nop,
    /// Anything else is ignored by the state machine
    Unknown(String),
}

impl Command {
    pub fn parse(payload: &[u8]) -> Result<Command> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| NodeError::Command("payload is not UTF-8".to_string()))?;

        let fields: Vec<&str> = text.split('|').collect();

        match fields[0] {
            "STORE_FILE" => {
                if fields.len() != 5 {
                    return Err(NodeError::Command(format!(
                        "STORE_FILE expects 5 fields, got {}",
                        fields.len()
                    )));
                }

                let content = BASE64
                    .decode(fields[4].trim_end())
                    .map_err(|e| NodeError::Command(format!("STORE_FILE bad content: {}", e)))?;

                Ok(Command::StoreFile {
                    name: fields[1].to_string(),
                    checksum: fields[2].to_string(),
                    size: fields[3].to_string(),
                    content,
                })
            }
            "REGISTER_MODEL" => {
                if fields.len() != 5 {
                    return Err(NodeError::Command(format!(
                        "REGISTER_MODEL expects 5 fields, got {}",
                        fields.len()
                    )));
                }

                Ok(Command::RegisterModel {
                    model_id: fields[1].to_string(),
                    model_type: fields[2].to_string(),
                    accuracy: fields[3].to_string(),
                    timestamp: fields[4].to_string(),
                })
            }
            "DELETE_FILE" => {
                if fields.len() != 2 {
                    return Err(NodeError::Command(format!(
                        "DELETE_FILE expects 2 fields, got {}",
                        fields.len()
                    )));
                }

                Ok(Command::DeleteFile {
                    name: fields[1].to_string(),
                })
            }
            "NOP" => Ok(Command::Nop),
            other => Ok(Command::Unknown(other.to_string())),
        }
    }
}
