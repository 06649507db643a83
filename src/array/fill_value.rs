//! Array fill values.

/// The element value of an array where nothing has been written, as native endian bytes.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FillValue(Vec<u8>);

impl core::fmt::Display for FillValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Vec<u8>> for FillValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<bool> for FillValue {
    fn from(value: bool) -> Self {
        Self(vec![u8::from(value)])
    }
}

macro_rules! fill_value_from_pod {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FillValue {
                fn from(value: $t) -> Self {
                    Self(bytemuck::bytes_of(&value).to_vec())
                }
            }
        )*
    };
}

fill_value_from_pod!(u8, u16, u32, u64, i8, i16, i32, i64, half::f16, half::bf16, f32, f64);

impl FillValue {
    /// Create a fill value from its native endian `bytes`.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the size in bytes of the fill value.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Return the byte representation of the fill value.
    #[must_use]
    pub fn as_ne_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns a vector holding `num_elements` repetitions of the fill value.
    #[must_use]
    pub fn repeat(&self, num_elements: usize) -> Vec<u8> {
        self.0.repeat(num_elements)
    }

    /// Returns true if `bytes` is a whole number of elements that all equal the fill value.
    #[must_use]
    pub fn equals_all(&self, bytes: &[u8]) -> bool {
        let element_size = self.0.len();
        element_size > 0
            && bytes.len() % element_size == 0
            && bytes
                .chunks_exact(element_size)
                .all(|element| element == self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_value() {
        let fill_value = FillValue::from(1.0f32);
        assert_eq!(fill_value.size(), 4);
        assert_eq!(fill_value.as_ne_bytes(), 1.0f32.to_ne_bytes());
        assert_eq!(FillValue::from(true).as_ne_bytes(), &[1]);
        assert_eq!(FillValue::from(half::f16::ONE).size(), 2);
        assert_eq!(FillValue::new(vec![1, 2, 3]).to_string(), "[1, 2, 3]");
    }

    #[test]
    fn fill_value_repeat_equals_all() {
        let fill_value = FillValue::from(7u16);
        let bytes = fill_value.repeat(3);
        assert_eq!(bytes.len(), 6);
        assert!(fill_value.equals_all(&bytes));
        assert!(!fill_value.equals_all(&bytes[..5]));
        assert!(!fill_value.equals_all(&FillValue::from(8u16).repeat(3)));
    }
}
