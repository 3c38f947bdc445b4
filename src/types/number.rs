//! Oracle NUMBER in its OCI internal encoding.

use crate::{Result, env::Env, oci::{self, OCINumber}};
use std::{fmt, mem};

/// Encoded size of an `OCINumber`.
pub(crate) const NUMBER_SIZE : usize = mem::size_of::<OCINumber>();

/**
Oracle NUMBER value encoded the way OCI stores it (`OCINumber`, 22 bytes).

Conversions are performed by the OCI number functions, so they need an environment
or a session to report errors through.

# Example

```no_run
use ocibind::Number;

let oracle = ocibind::env()?;
let num = Number::from_int(42, &oracle)?;
assert_eq!(num.to_int(&oracle)?, 42);
assert_eq!(num.to_real(&oracle)?, 42.0);
# Ok::<(),ocibind::Error>(())
```
*/
#[derive(Clone, Copy)]
pub struct Number {
    num: OCINumber,
}

impl Number {
    /// Encodes an integer.
    pub fn from_int(val: i64, ctx: &dyn Env) -> Result<Self> {
        let mut num = OCINumber::zero();
        oci::number_from_int(ctx.err_ptr(), &val, &mut num)?;
        Ok( Self { num } )
    }

    /// Encodes a floating point number.
    pub fn from_real(val: f64, ctx: &dyn Env) -> Result<Self> {
        let mut num = OCINumber::zero();
        oci::number_from_real(ctx.err_ptr(), &val, &mut num)?;
        Ok( Self { num } )
    }

    /// Decodes the number as a signed 64-bit integer. Fractions are truncated by OCI.
    pub fn to_int(&self, ctx: &dyn Env) -> Result<i64> {
        let mut val = 0i64;
        oci::number_to_int(ctx.err_ptr(), &self.num, &mut val)?;
        Ok( val )
    }

    /// Decodes the number as a double.
    pub fn to_real(&self, ctx: &dyn Env) -> Result<f64> {
        let mut val = 0f64;
        oci::number_to_real(ctx.err_ptr(), &self.num, &mut val)?;
        Ok( val )
    }

    pub(crate) fn from_oci(num: OCINumber) -> Self {
        Self { num }
    }

    /// Returns the encoded number.
    pub fn as_oci(&self) -> &OCINumber {
        &self.num
    }

    /// Returns the significant part of the encoding: the length byte followed by the mantissa.
    pub(crate) fn encoded(&self) -> &[u8] {
        let len = (self.num.bytes[0] as usize + 1).min(NUMBER_SIZE);
        &self.num.bytes[..len]
    }
}

impl Default for Number {
    /// Zero
    fn default() -> Self {
        Self { num: OCINumber::zero() }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.encoded() == other.encoded()
    }
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Number").field(&self.encoded()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_encoded_zero() {
        let zero = Number::default();
        assert_eq!(zero.encoded(), &[1u8, 128]);
        assert_eq!(NUMBER_SIZE, 22);
    }

    #[test]
    fn equality_ignores_bytes_past_the_encoded_length() {
        let mut a = OCINumber::zero();
        let mut b = OCINumber::zero();
        a.bytes[5] = 0xAA;
        b.bytes[5] = 0x55;
        assert_eq!(Number::from_oci(a), Number::from_oci(b));
        // 7 is encoded as [2, 193, 8]
        b.bytes[0] = 2;
        b.bytes[1] = 193;
        b.bytes[2] = 8;
        assert_ne!(Number::from_oci(a), Number::from_oci(b));
        assert_eq!(Number::from_oci(b).encoded(), &[2u8, 193, 8]);
    }
}
