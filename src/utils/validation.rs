use validator::{Validate, ValidationErrors};

use crate::errors::AppError;

pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload
        .validate()
        .map_err(|err| AppError::BadRequest(describe(&err)))
}

/// One line per failing field, e.g. `Validation failed: email: [email]`.
pub fn describe(err: &ValidationErrors) -> String {
    let mut fields: Vec<_> = err.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    let details = fields
        .iter()
        .map(|(field, errs)| {
            let errors = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => format!("{}: {}", e.code, message),
                    None => e.code.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}: [{}]", field, errors)
        })
        .collect::<Vec<_>>()
        .join("; ");

    format!("Validation failed: {}", details)
}
