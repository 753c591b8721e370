mod build;
mod environment;
mod result;

pub use build::{
    ActionRecord, ArtifactRecord, BuildRecord, CauseRecord, ExecutorRecord, ParameterRecord,
};
pub use environment::{ConsoleLog, EnvironmentMap};
pub use result::BuildResult;
