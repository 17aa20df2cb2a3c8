//! Serde helpers for const-generic array fields.

/// Serializes `[T; N]` fields as sequences so the derives on rects and
/// corner masks work for any dimensionality.
pub(crate) mod array {
    use serde::de::Error;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T, const N: usize>(value: &[T; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        let mut seq = serializer.serialize_seq(Some(N))?;
        for element in value {
            seq.serialize_element(element)?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D, T, const N: usize>(deserializer: D) -> Result<[T; N], D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let values: Vec<T> = Vec::deserialize(deserializer)?;
        let found = values.len();
        values
            .try_into()
            .map_err(|_| D::Error::invalid_length(found, &"an array of the declared dimensionality"))
    }
}
