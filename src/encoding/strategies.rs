use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{DecodeError, EncodeError, EncodedString, Encoder, Validate};

/// Caller-supplied conversion pair.
pub struct CustomStringEncoder<T> {
    to_string: fn(&T) -> String,
    from_str: fn(&str) -> Result<T, DecodeError>,
}

impl<T> CustomStringEncoder<T> {
    pub const fn new(to_string: fn(&T) -> String, from_str: fn(&str) -> Result<T, DecodeError>) -> Self {
        Self {
            to_string,
            from_str,
        }
    }
}

impl<T> fmt::Debug for CustomStringEncoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomStringEncoder").finish_non_exhaustive()
    }
}

impl<T> Encoder<T> for CustomStringEncoder<T> {
    fn encode(&self, value: &T) -> Result<EncodedString, EncodeError> {
        Ok(EncodedString::new((self.to_string)(value)))
    }

    fn decode(&self, encoded: &str) -> Result<T, DecodeError> {
        (self.from_str)(encoded)
    }
}

/// Identity encoding for payloads that already are strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawStringEncoder;

impl Encoder<String> for RawStringEncoder {
    fn encode(&self, value: &String) -> Result<EncodedString, EncodeError> {
        Ok(EncodedString::new(value.clone()))
    }

    fn decode(&self, encoded: &str) -> Result<String, DecodeError> {
        Ok(encoded.to_string())
    }
}

/// JSON objects with no schema beyond "is an object".
#[derive(Debug, Clone, Copy, Default)]
pub struct UntypedObjectEncoder;

impl Encoder<serde_json::Value> for UntypedObjectEncoder {
    fn encode(&self, value: &serde_json::Value) -> Result<EncodedString, EncodeError> {
        if !value.is_object() {
            return Err(EncodeError::Unsupported(
                "untyped payloads must be JSON objects".into(),
            ));
        }
        Ok(EncodedString::new(serde_json::to_string(value)?))
    }

    fn decode(&self, encoded: &str) -> Result<serde_json::Value, DecodeError> {
        let value: serde_json::Value = serde_json::from_str(encoded)?;
        if !value.is_object() {
            return Err(DecodeError::malformed("expected a JSON object"));
        }
        Ok(value)
    }
}

/// Typed JSON with a structural [`Validate`] pass on both directions.
pub struct SchemaEncoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SchemaEncoder<T> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SchemaEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SchemaEncoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaEncoder<{}>", std::any::type_name::<T>())
    }
}

impl<T> Encoder<T> for SchemaEncoder<T>
where
    T: Serialize + DeserializeOwned + Validate,
{
    fn encode(&self, value: &T) -> Result<EncodedString, EncodeError> {
        value.validate()?;
        Ok(EncodedString::new(serde_json::to_string(value)?))
    }

    fn decode(&self, encoded: &str) -> Result<T, DecodeError> {
        let raw: serde_json::Value = serde_json::from_str(encoded)?;
        if !raw.is_object() {
            return Err(DecodeError::malformed("expected a JSON object"));
        }
        let value: T = serde_json::from_value(raw)?;
        value.validate()?;
        Ok(value)
    }
}
