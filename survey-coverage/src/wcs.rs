//! All-sky Hammer-Aitoff (`AIT`) projection used for coverage plots.
//!
//! Pixel coordinates follow the FITS convention: the centre of the first
//! pixel is (1, 1). With the reference point on the equator, native and
//! celestial coordinates differ only by the reference right ascension, so
//! `ra = crval1 + phi` and `dec = theta`.

use crate::error::{Result, SurveyError};
use celestial_moc::fits::{Card, Header};
use std::f64::consts::{PI, SQRT_2};

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

pub const CTYPE_RA: &str = "RA---AIT";
pub const CTYPE_DEC: &str = "DEC--AIT";

/// Tolerance on the ellipse boundary in the deprojection.
const BOUNDARY_EPSILON: f64 = 1e-12;

/// A two-axis AIT sky projection with a fixed image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyProjection {
    crval: [f64; 2],
    cdelt: [f64; 2],
    crpix: [f64; 2],
    size: [u32; 2],
}

impl SkyProjection {
    /// The default whole-sky frame: 480x240 pixels centred on (0, 0) at
    /// 0.675 degrees per pixel, RA increasing to the left.
    pub fn all_sky() -> Self {
        Self {
            crval: [0.0, 0.0],
            cdelt: [-0.675, 0.675],
            crpix: [240.5, 120.5],
            size: [480, 240],
        }
    }

    /// Build a projection from WCS keyword values.
    ///
    /// # Errors
    /// [`SurveyError::Configuration`] unless the axis types are
    /// `RA---AIT`/`DEC--AIT`, the reference point lies on the equator, every
    /// value is finite, the scales are non-zero and the image is non-empty.
    pub fn new(
        ctype: [&str; 2],
        crval: [f64; 2],
        cdelt: [f64; 2],
        crpix: [f64; 2],
        size: [u32; 2],
    ) -> Result<Self> {
        if ctype != [CTYPE_RA, CTYPE_DEC] {
            return Err(SurveyError::configuration(format!(
                "unsupported axis types {:?}, expected [{:?}, {:?}]",
                ctype, CTYPE_RA, CTYPE_DEC
            )));
        }
        let all_finite = crval.iter().chain(&cdelt).chain(&crpix).all(|v| v.is_finite());
        if !all_finite {
            return Err(SurveyError::configuration("projection values must be finite"));
        }
        if crval[1] != 0.0 {
            return Err(SurveyError::configuration(format!(
                "reference declination must be 0, got {}",
                crval[1]
            )));
        }
        if cdelt[0] == 0.0 || cdelt[1] == 0.0 {
            return Err(SurveyError::configuration("pixel scale must be non-zero"));
        }
        if size[0] == 0 || size[1] == 0 {
            return Err(SurveyError::configuration("image size must be non-zero"));
        }
        Ok(Self {
            crval: [crval[0].rem_euclid(360.0), crval[1]],
            cdelt,
            crpix,
            size,
        })
    }

    #[inline]
    pub fn crval(&self) -> [f64; 2] {
        self.crval
    }

    #[inline]
    pub fn cdelt(&self) -> [f64; 2] {
        self.cdelt
    }

    #[inline]
    pub fn crpix(&self) -> [f64; 2] {
        self.crpix
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size[0]
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size[1]
    }

    /// Sky position of a pixel, or `None` outside the projection ellipse.
    pub fn pixel_to_sky(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let inter_x = self.cdelt[0] * (x - self.crpix[0]);
        let inter_y = self.cdelt[1] * (y - self.crpix[1]);
        let (phi, theta) = deproject_ait(inter_x, inter_y)?;
        Some(((self.crval[0] + phi).rem_euclid(360.0), theta))
    }

    /// Pixel position of a sky coordinate, or `None` for a non-finite
    /// coordinate or |Dec| > 90.
    pub fn sky_to_pixel(&self, ra_deg: f64, dec_deg: f64) -> Option<(f64, f64)> {
        if !ra_deg.is_finite() || !dec_deg.is_finite() || dec_deg.abs() > 90.0 {
            return None;
        }
        let phi = wrap_longitude(ra_deg - self.crval[0]);
        let (inter_x, inter_y) = project_ait(phi, dec_deg);
        Some((
            inter_x / self.cdelt[0] + self.crpix[0],
            inter_y / self.cdelt[1] + self.crpix[1],
        ))
    }

    /// Whether a pixel centre falls inside the projection ellipse.
    pub fn is_on_sky(&self, x: f64, y: f64) -> bool {
        self.pixel_to_sky(x, y).is_some()
    }

    /// Pixel positions tracing the projection boundary, closed (the last
    /// point repeats the first).
    pub fn frame(&self, samples: usize) -> Vec<(f64, f64)> {
        let samples = samples.max(4);
        let semi_x = 2.0 * SQRT_2 * RAD_TO_DEG;
        let semi_y = SQRT_2 * RAD_TO_DEG;
        (0..=samples)
            .map(|k| {
                let t = 2.0 * PI * k as f64 / samples as f64;
                let (sin_t, cos_t) = t.sin_cos();
                (
                    semi_x * cos_t / self.cdelt[0] + self.crpix[0],
                    semi_y * sin_t / self.cdelt[1] + self.crpix[1],
                )
            })
            .collect()
    }

    /// WCS keywords describing this projection as an image header.
    pub fn to_header(&self) -> Header {
        let mut header = Header::new();
        header.push(Card::new("NAXIS", 2i64));
        header.push(Card::new("NAXIS1", i64::from(self.size[0])));
        header.push(Card::new("NAXIS2", i64::from(self.size[1])));
        header.push(Card::new("WCSAXES", 2i64));
        header.push(Card::new("CTYPE1", CTYPE_RA));
        header.push(Card::new("CTYPE2", CTYPE_DEC));
        header.push(Card::new("CRVAL1", self.crval[0]));
        header.push(Card::new("CRVAL2", self.crval[1]));
        header.push(Card::new("CDELT1", self.cdelt[0]));
        header.push(Card::new("CDELT2", self.cdelt[1]));
        header.push(Card::new("CRPIX1", self.crpix[0]));
        header.push(Card::new("CRPIX2", self.crpix[1]));
        header.push(Card::new("CUNIT1", "deg"));
        header.push(Card::new("CUNIT2", "deg"));
        header
    }
}

impl Default for SkyProjection {
    fn default() -> Self {
        Self::all_sky()
    }
}

/// Wrap a longitude difference into (-180, 180].
fn wrap_longitude(deg: f64) -> f64 {
    let wrapped = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Forward AIT. `phi_deg` must lie in [-180, 180], where the denominator
/// stays at or above 1.
fn project_ait(phi_deg: f64, theta_deg: f64) -> (f64, f64) {
    let phi = phi_deg * DEG_TO_RAD;
    let theta = theta_deg * DEG_TO_RAD;

    let (sin_theta, cos_theta) = theta.sin_cos();
    let half_phi = phi / 2.0;

    let denom = 1.0 + cos_theta * half_phi.cos();
    let gamma = libm::sqrt(2.0 / denom);
    let x = 2.0 * gamma * cos_theta * half_phi.sin() * RAD_TO_DEG;
    let y = gamma * sin_theta * RAD_TO_DEG;
    (x, y)
}

fn deproject_ait(x_deg: f64, y_deg: f64) -> Option<(f64, f64)> {
    let x = x_deg * DEG_TO_RAD;
    let y = y_deg * DEG_TO_RAD;

    let x_scaled = x / 4.0;
    let y_scaled = y / 2.0;

    // The ellipse x^2/8 + y^2/2 = 1 maps to z^2 = 1/2.
    let z_sq = 1.0 - x_scaled * x_scaled - y_scaled * y_scaled;
    if z_sq < 0.5 - BOUNDARY_EPSILON {
        return None;
    }

    let z = libm::sqrt(z_sq);
    let theta = (y * z).clamp(-1.0, 1.0).asin();
    let phi = 2.0 * (x * z / 2.0).atan2(2.0 * z * z - 1.0);

    Some((phi * RAD_TO_DEG, theta * RAD_TO_DEG))
}
