//! Secure string type for the console password.
//!
//! `SecretString` zeroes its memory on drop and never shows its contents in
//! `Debug`, `Display` or serialized output, so the password can sit inside the
//! configuration without leaking into logs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// A string that is zeroed on drop and redacted when printed.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Compares the secret with a candidate value.
	pub fn matches(&self, candidate: &str) -> bool {
		self.0.as_str() == candidate
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

// Serialized configuration never carries the secret back out.
impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_secret_is_redacted_everywhere() {
		let secret = SecretString::from("eashop25");

		assert_eq!(format!("{:?}", secret), "SecretString(***REDACTED***)");
		assert_eq!(format!("{}", secret), REDACTED);
		assert_eq!(
			serde_json::to_string(&secret).unwrap(),
			format!("\"{}\"", REDACTED)
		);
	}

	#[test]
	fn test_matches_exact_value_only() {
		let secret = SecretString::from("eashop25");

		assert!(secret.matches("eashop25"));
		assert!(!secret.matches("eashop2"));
		assert!(!secret.matches(""));
	}

	#[test]
	fn test_deserializes_plain_string() {
		let secret: SecretString = serde_json::from_str("\"hunter2\"").unwrap();
		assert!(secret.matches("hunter2"));
		assert!(!secret.is_empty());
	}
}
