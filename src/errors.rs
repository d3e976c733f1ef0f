use thiserror::Error;
use crate::descriptor::ReportType;
use crate::sensors::SensorKind;

/// Report buffer and identity record allocation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("Refusing to allocate a zero-sized report buffer")]
    ZeroSized,

    #[error("Out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },
}

/// Descriptor provider errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("No {report_type} report descriptor for {kind}")]
    Unsupported { kind: SensorKind, report_type: ReportType },

    #[error("Descriptor for {kind} has invalid size {size}")]
    InvalidSize { kind: SensorKind, size: usize },
}

/// Input subsystem errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Device '{name}' rejected by input subsystem: {reason}")]
    Rejected { name: String, reason: String },

    #[error("Input subsystem has no free device slots (capacity {capacity})")]
    Exhausted { capacity: usize },
}

/// Bus/transport errors seen when routing report reads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("Hardware unit is no longer attached")]
    Detached,

    #[error("Sensor {kind} is not present on the bus")]
    NotPresent { kind: SensorKind },

    #[error("Report for {kind} is {actual} bytes, buffer holds {capacity}")]
    ReportTooLarge { kind: SensorKind, actual: usize, capacity: usize },
}

/// Errors from building a single sensor device
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreateError {
    #[error("Allocation failed for {kind}: {source}")]
    AllocationFailed {
        kind: SensorKind,
        #[source]
        source: AllocError,
    },

    #[error("Input descriptor unavailable for {kind}: {source}")]
    DescriptorUnavailable {
        kind: SensorKind,
        #[source]
        source: DescriptorError,
    },

    #[error("Registration failed for {kind}: {source}")]
    RegistrationFailed {
        kind: SensorKind,
        #[source]
        source: RegistrationError,
    },
}

impl CreateError {
    /// The sensor kind whose creation failed
    pub fn kind(&self) -> SensorKind {
        match self {
            CreateError::AllocationFailed { kind, .. }
            | CreateError::DescriptorUnavailable { kind, .. }
            | CreateError::RegistrationFailed { kind, .. } => *kind,
        }
    }
}

/// Client lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Unit {unit} is already initialized with {live} live device(s); deinit first")]
    AlreadyInitialized { unit: u32, live: usize },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<CreateError> for String {
    fn from(error: CreateError) -> Self {
        error.to_string()
    }
}

impl From<LifecycleError> for String {
    fn from(error: LifecycleError) -> Self {
        error.to_string()
    }
}

impl From<ConfigError> for String {
    fn from(error: ConfigError) -> Self {
        error.to_string()
    }
}

/// Result type aliases for convenience
pub type AllocResult<T> = Result<T, AllocError>;
pub type DescriptorResult<T> = Result<T, DescriptorError>;
pub type BusResult<T> = Result<T, BusError>;
pub type CreateResult<T> = Result<T, CreateError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
