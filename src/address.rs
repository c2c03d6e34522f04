//! Free-text address parsing.

use crate::error::ArvError;

/// A street address split into the tokens the MLS search form expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetAddress {
    pub number: String,
    pub name: String,
    pub street_type: String,
}

impl StreetAddress {
    /// Splits on whitespace: the first token is the street number, the last
    /// token the street type, everything between is the street name (which
    /// may be empty for single- and two-token addresses).
    pub fn parse(raw: &str) -> Result<Self, ArvError> {
        let parts: Vec<&str> = raw.split_whitespace().collect();
        if parts.is_empty() {
            return Err(ArvError::InvalidAddress("address cannot be empty".to_string()));
        }

        let number = parts[0].to_string();
        let street_type = parts[parts.len() - 1].to_string();
        let name = if parts.len() > 2 {
            parts[1..parts.len() - 1].join(" ")
        } else {
            String::new()
        };

        Ok(Self {
            number,
            name,
            street_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_number_name_and_type() {
        let addr = StreetAddress::parse("500 Main St").unwrap();
        assert_eq!(addr.number, "500");
        assert_eq!(addr.name, "Main");
        assert_eq!(addr.street_type, "St");
    }

    #[test]
    fn joins_multi_word_street_names() {
        let addr = StreetAddress::parse("1100 E Martin Luther King Blvd").unwrap();
        assert_eq!(addr.number, "1100");
        assert_eq!(addr.name, "E Martin Luther King");
        assert_eq!(addr.street_type, "Blvd");
    }

    #[test]
    fn single_token_is_both_number_and_type() {
        let addr = StreetAddress::parse("Broadway").unwrap();
        assert_eq!(addr.number, "Broadway");
        assert_eq!(addr.name, "");
        assert_eq!(addr.street_type, "Broadway");
    }

    #[test]
    fn rejects_blank_input() {
        assert!(StreetAddress::parse("").is_err());
        assert!(StreetAddress::parse("   ").is_err());
    }
}
