use rst_common::with_errors::thiserror::{self, Error};

#[derive(Error, PartialEq, Debug)]
pub enum DbError {
    #[error("db engine error: {0}")]
    EngineError(String),

    #[error("instruction error: {0}")]
    InstructionError(String),
}

pub enum Instruction {
    SaveCf { key: String, value: Vec<u8> },
    GetCf { key: String },
    RemoveCf { key: String },

    /// every key starting with `prefix`, in key order
    PrefixKeysCf { prefix: String },
}

#[derive(Debug)]
pub enum OutputOpts {
    SingleByte { value: Option<Vec<u8>> },
    Keys { keys: Vec<String> },
    None,
}

impl OutputOpts {
    pub fn is_none(&self) -> bool {
        matches!(self, OutputOpts::None)
    }
}
