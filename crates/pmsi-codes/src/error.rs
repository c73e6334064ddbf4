//! Error type for code parsing

/// Errors returned when parsing code values from strings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    /// Date is not `YYYY-MM-DD` or `DDMMYYYY`
    #[error("malformed date '{0}'")]
    MalformedDate(String),

    /// Diagnosis code does not follow the ICD-10 shape
    #[error("malformed diagnosis code '{0}'")]
    MalformedDiagnosis(String),

    /// Procedure code does not follow the CCAM shape
    #[error("malformed procedure code '{0}'")]
    MalformedProcedure(String),

    /// GHM code does not follow the `DDADD[mode]` shape
    #[error("malformed GHM code '{0}'")]
    MalformedGhm(String),

    /// Unknown supplement name
    #[error("unknown supplement type '{0}'")]
    UnknownSupplement(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_error_display() {
        let err = CodeError::MalformedDiagnosis("1ZZ".to_string());
        assert_eq!(err.to_string(), "malformed diagnosis code '1ZZ'");

        let err = CodeError::UnknownSupplement("FOO".to_string());
        assert_eq!(err.to_string(), "unknown supplement type 'FOO'");
    }
}
