//! HEALPix nested-scheme indexing and NUNIQ cell encoding.
//!
//! Provides conversion from sky coordinates to nested pixel indices and the
//! `uniq = 4 * 4^order + ipix` packing used by MOC FITS files.

use crate::error::{MocError, MocResult};
use std::f64::consts::{FRAC_PI_2, PI};

/// Deepest HEALPix order representable in a 64-bit NUNIQ value.
pub const MAX_ORDER: u8 = 29;

const TWOPI: f64 = 2.0 * PI;

/// Number of pixels covering the sphere at `order`.
#[inline]
pub fn npix(order: u8) -> u64 {
    12u64 << (2 * order as u32)
}

/// A single HEALPix cell in the nested scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell {
    pub order: u8,
    pub ipix: u64,
}

impl Cell {
    /// Build a cell, checking the order and pixel bounds.
    pub fn new(order: u8, ipix: u64) -> MocResult<Self> {
        if order > MAX_ORDER {
            return Err(MocError::invalid_cell(format!(
                "order {} exceeds {}",
                order, MAX_ORDER
            )));
        }
        if ipix >= npix(order) {
            return Err(MocError::invalid_cell(format!(
                "pixel {} out of range for order {}",
                ipix, order
            )));
        }
        Ok(Self { order, ipix })
    }

    /// Decode a NUNIQ value into its order and pixel index.
    pub fn from_uniq(uniq: u64) -> MocResult<Self> {
        if uniq < 4 {
            return Err(MocError::invalid_cell(format!("uniq value {} below 4", uniq)));
        }
        let msb = 63 - uniq.leading_zeros();
        let order = msb / 2 - 1;
        if order > MAX_ORDER as u32 {
            return Err(MocError::invalid_cell(format!(
                "uniq value {} encodes order {}",
                uniq, order
            )));
        }
        let ipix = uniq - (4u64 << (2 * order));
        Ok(Self {
            order: order as u8,
            ipix,
        })
    }

    #[inline]
    pub fn uniq(&self) -> u64 {
        (4u64 << (2 * self.order as u32)) + self.ipix
    }

    /// Half-open pixel range covered by this cell at [`MAX_ORDER`].
    #[inline]
    pub fn range_at_max_order(&self) -> (u64, u64) {
        let shift = 2 * (MAX_ORDER - self.order) as u32;
        (self.ipix << shift, (self.ipix + 1) << shift)
    }
}

/// Convert (RA, Dec) in degrees to HEALPix nested pixel index.
///
/// Implements the Gorski et al. (2005) algorithm for the nested scheme.
///
/// # Arguments
/// * `order` - HEALPix order (nside = 2^order), at most [`MAX_ORDER`]
/// * `ra_deg` - Right ascension in degrees
/// * `dec_deg` - Declination in degrees
///
/// # Returns
/// Nested pixel index in range [0, 12*nside^2)
pub fn ang2pix_nest(order: u8, ra_deg: f64, dec_deg: f64) -> u64 {
    let phi = ra_deg.to_radians();
    let z = libm::sin(dec_deg.to_radians());
    let nside = 1u64 << order;
    let (face, ix, iy) = compute_face_and_position(phi, z, nside);
    let ipix_in_face = xy2pix_nest(ix, iy, order);
    face as u64 * nside * nside + ipix_in_face
}

/// Determine which of the 12 HEALPix base faces contains the point,
/// and compute the (ix, iy) position within that face.
fn compute_face_and_position(phi: f64, z: f64, nside: u64) -> (u32, u64, u64) {
    let z_abs = libm::fabs(z);
    let tt = phi_to_tt(phi);
    if z_abs <= 2.0 / 3.0 {
        compute_equatorial_face(tt, z, nside)
    } else {
        compute_polar_face(tt, z, z_abs, nside)
    }
}

/// Convert phi to tt in [0, 4), one unit per quadrant.
fn phi_to_tt(phi: f64) -> f64 {
    let mut phi_norm = phi % TWOPI;
    if phi_norm < 0.0 {
        phi_norm += TWOPI;
    }
    let tt = phi_norm / FRAC_PI_2;
    if tt >= 4.0 {
        0.0
    } else {
        tt
    }
}

/// Compute face and position for equatorial belt (-2/3 <= z <= 2/3).
fn compute_equatorial_face(tt: f64, z: f64, nside: u64) -> (u32, u64, u64) {
    let temp1 = nside as f64 * (0.5 + tt);
    let temp2 = nside as f64 * z * 0.75;
    let jp = (temp1 - temp2) as u64;
    let jm = (temp1 + temp2) as u64;
    let order = nside.trailing_zeros();
    let ifp = jp >> order;
    let ifm = jm >> order;
    let face = if ifp == ifm {
        (ifp | 4) as u32
    } else if ifp < ifm {
        ifp as u32
    } else {
        (ifm + 8) as u32
    };
    let mask = nside - 1;
    let ix = jm & mask;
    let iy = nside - (jp & mask) - 1;
    (face, ix, iy)
}

/// Compute face and position for polar caps (|z| > 2/3).
fn compute_polar_face(tt: f64, z: f64, z_abs: f64, nside: u64) -> (u32, u64, u64) {
    let ntt = (libm::floor(tt) as u32).min(3);
    let tp = tt - ntt as f64;
    let tmp = nside as f64 * libm::sqrt(3.0 * (1.0 - z_abs));
    let jp = ((tp * tmp) as u64).min(nside - 1);
    let jm = (((1.0 - tp) * tmp) as u64).min(nside - 1);
    if z > 0.0 {
        (ntt, nside - jm - 1, nside - jp - 1)
    } else {
        (ntt + 8, jp, jm)
    }
}

/// Convert (ix, iy) to nested pixel index within a base face using Z-order curve.
fn xy2pix_nest(ix: u64, iy: u64, order: u8) -> u64 {
    let mut result: u64 = 0;
    for i in 0..order as u32 {
        let bit_x = (ix >> i) & 1;
        let bit_y = (iy >> i) & 1;
        result |= (bit_x << (2 * i)) | (bit_y << (2 * i + 1));
    }
    result
}
