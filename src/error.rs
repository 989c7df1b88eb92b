use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level error taxonomy for the pricing engine (§7).
///
/// Each variant carries one inner, subsystem-scoped error enum. `code()` and
/// `status()` expose the machine-readable code and transport status from the
/// error kind table without leaking transport concerns into the inner enums.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Calculation(#[from] CalculationError),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl EngineError {
    /// Machine-readable error code from §7.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "INVALID_PARAMETER",
            EngineError::RateLimit(_) => "RATE_LIMIT_EXCEEDED",
            EngineError::Upstream(UpstreamError::TickerNotFound(_)) => "TICKER_NOT_FOUND",
            EngineError::Upstream(_) => "EXTERNAL_UNAVAILABLE",
            EngineError::Calculation(_) => "CALCULATION_ERROR",
            EngineError::Broker(BrokerError::NotFound(_)) => "CLIENT_NOT_FOUND",
            EngineError::Broker(_) => "UNAUTHORIZED",
        }
    }

    /// Transport status from §7's error kind table.
    pub fn status(&self) -> u16 {
        match self {
            EngineError::Validation(_) => 400,
            EngineError::RateLimit(_) => 429,
            EngineError::Upstream(UpstreamError::TickerNotFound(_)) => 404,
            EngineError::Upstream(_) => 503,
            EngineError::Calculation(_) => 500,
            EngineError::Broker(BrokerError::NotFound(_)) => 404,
            EngineError::Broker(_) => 401,
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            EngineError::RateLimit(RateLimitError::Exceeded { retry_after, .. }) => {
                Some(*retry_after)
            }
            _ => None,
        }
    }
}

/// Errors raised by schema/validation (C10).
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid ticker '{0}': must be 1-5 uppercase letters")]
    InvalidTicker(String),

    #[error("invalid client id '{0}': must be 3-50 chars of [A-Za-z0-9_-]")]
    InvalidClientId(String),

    #[error("invalid position value {0}: must be in [0.01, 1000000000]")]
    InvalidPositionValue(rust_decimal::Decimal),

    #[error("invalid loan days {0}: must be in [1, 365]")]
    InvalidLoanDays(i64),

    #[error("request failed validation on {} field(s)", .0.len())]
    MultipleFailures(Vec<FieldFailure>),
}

#[derive(Debug, Clone)]
pub struct FieldFailure {
    pub field: String,
    pub location: &'static str,
    pub message: String,
}

/// Errors raised by the rate limiter (C7).
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded for client '{client_id}': retry after {retry_after}s")]
    Exceeded {
        client_id: String,
        retry_after: u64,
        limit: u32,
    },
}

/// Errors raised by upstream clients after retry and circuit-breaker
/// exhaustion (C4). Transport-level failures are folded into `Unavailable`
/// at the client boundary, per §7's propagation policy.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream '{service}' unavailable: {reason}")]
    Unavailable { service: String, reason: String },

    #[error("circuit open for upstream '{service}'")]
    CircuitOpen { service: String },

    #[error("ticker '{0}' not found and no fallback base rate available")]
    TickerNotFound(String),

    #[error("request to '{service}' timed out after {0:?}", .timeout)]
    Timeout {
        service: String,
        timeout: std::time::Duration,
    },
}

/// Defensive errors raised when a calculation invariant is violated (C5/C6).
/// These indicate a bug, never a user error.
#[derive(Debug, Error)]
pub enum CalculationError {
    #[error("breakdown components {borrow_cost} + {markup} + {transaction_fee} do not sum to total {total}")]
    BreakdownMismatch {
        borrow_cost: rust_decimal::Decimal,
        markup: rust_decimal::Decimal,
        transaction_fee: rust_decimal::Decimal,
        total: rust_decimal::Decimal,
    },

    #[error("final borrow rate {0} below floor {1}")]
    BelowMinimumRate(rust_decimal::Decimal, rust_decimal::Decimal),

    #[error("negative calculation result: {0}")]
    Negative(String),
}

/// Errors raised resolving broker configuration / client identity.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("client '{0}' is unknown or revoked")]
    Unauthorized(String),

    #[error("client id '{0}' not found in broker configuration store")]
    NotFound(String),
}
