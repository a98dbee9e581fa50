//! MOC decoding, point-in-region queries and FITS serialization.

use crate::error::{MocError, MocResult};
use crate::fits::{self, Card, Header, Hdu};
use crate::healpix::{ang2pix_nest, npix, Cell, MAX_ORDER};
use crate::ranges::RangeSet;
use byteorder::{BigEndian, ByteOrder};
use memmap2::Mmap;
use std::fs::{self, File};
use std::path::Path;

const UNIQ_COLUMN_NAMES: [&str; 2] = ["UNIQ", "NUNIQ"];

/// A sky region stored as a union of HEALPix cells of mixed order.
///
/// Internally the cells are flattened into sorted ranges at [`MAX_ORDER`],
/// so point queries are a single HEALPix lookup plus a binary search.
#[derive(Debug, Clone, PartialEq)]
pub struct Moc {
    depth: u8,
    ranges: RangeSet,
}

impl Moc {
    /// Build a MOC with an explicit depth. Every cell must be at or above it.
    pub fn new(depth: u8, cells: impl IntoIterator<Item = Cell>) -> MocResult<Self> {
        if depth > MAX_ORDER {
            return Err(MocError::invalid_cell(format!(
                "depth {} exceeds {}",
                depth, MAX_ORDER
            )));
        }
        let cells: Vec<Cell> = cells.into_iter().collect();
        if let Some(cell) = cells.iter().find(|c| c.order > depth) {
            return Err(MocError::invalid_cell(format!(
                "cell of order {} deeper than MOC depth {}",
                cell.order, depth
            )));
        }
        Ok(Self {
            depth,
            ranges: RangeSet::from_cells(cells),
        })
    }

    /// Build a MOC whose depth is the deepest cell given.
    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Self {
        let cells: Vec<Cell> = cells.into_iter().collect();
        let depth = cells.iter().map(|c| c.order).max().unwrap_or(0);
        Self {
            depth,
            ranges: RangeSet::from_cells(cells),
        }
    }

    /// Memory-map and decode a MOC FITS file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not a valid
    /// NUNIQ-encoded MOC.
    pub fn open(path: impl AsRef<Path>) -> MocResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(MocError::invalid_format(format!(
                "{} is empty",
                path.display()
            )));
        }
        let mmap = unsafe { Mmap::map(&file) }?;
        let moc = Self::from_fits_bytes(&mmap)?;
        tracing::debug!(
            path = %path.display(),
            depth = moc.depth,
            ranges = moc.ranges.len(),
            "decoded MOC"
        );
        Ok(moc)
    }

    /// Decode a MOC from the bytes of a FITS file.
    pub fn from_fits_bytes(bytes: &[u8]) -> MocResult<Self> {
        let hdus = fits::read_hdus(bytes)?;
        let table = hdus
            .get(1)
            .ok_or_else(|| MocError::invalid_format("no binary table extension"))?;

        let xtension = table.header.string("XTENSION").unwrap_or_default();
        if xtension != "BINTABLE" {
            return Err(MocError::invalid_keyword_value("XTENSION", xtension));
        }
        if let Some(ordering) = table.header.string("ORDERING") {
            if !ordering.eq_ignore_ascii_case("NUNIQ") {
                return Err(MocError::invalid_keyword_value("ORDERING", ordering));
            }
        }

        let cells = read_uniq_column(table)?;
        let deepest = cells.iter().map(|c| c.order).max();
        let declared = declared_depth(&hdus)?;

        let depth = match (declared, deepest) {
            (Some(declared), Some(deepest)) if deepest > declared => {
                return Err(MocError::invalid_format(format!(
                    "cell of order {} exceeds declared MOC order {}",
                    deepest, declared
                )));
            }
            (Some(declared), _) => declared,
            (None, deepest) => deepest.unwrap_or(0),
        };

        Ok(Self {
            depth,
            ranges: RangeSet::from_cells(cells),
        })
    }

    /// The MOC order: the resolution at which membership is decided.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether the point (RA, Dec) in degrees lies inside the region.
    pub fn contains(&self, ra_deg: f64, dec_deg: f64) -> bool {
        let pixel = ang2pix_nest(self.depth, ra_deg, dec_deg);
        let shift = 2 * (MAX_ORDER - self.depth) as u32;
        self.ranges.contains(pixel << shift)
    }

    /// Fraction of the celestial sphere covered, in [0, 1].
    pub fn sky_fraction(&self) -> f64 {
        self.ranges.covered() as f64 / npix(MAX_ORDER) as f64
    }

    /// The region as its minimal list of cells, ordered by NUNIQ value.
    pub fn cells(&self) -> Vec<Cell> {
        let mut cells = self.ranges.to_cells();
        cells.sort_by_key(Cell::uniq);
        cells
    }

    /// Encode as a MOC 1.0 FITS file: empty primary HDU plus a one-column
    /// `1K` NUNIQ binary table.
    pub fn to_fits_bytes(&self) -> Vec<u8> {
        let cells = self.cells();

        let mut primary = Header::new();
        primary.push(Card::new("SIMPLE", true));
        primary.push(Card::new("BITPIX", 8i64));
        primary.push(Card::new("NAXIS", 0i64));
        primary.push(Card::new("EXTEND", true));

        let mut table = Header::new();
        table.push(Card::new("XTENSION", "BINTABLE"));
        table.push(Card::new("BITPIX", 8i64));
        table.push(Card::new("NAXIS", 2i64));
        table.push(Card::new("NAXIS1", 8i64));
        table.push(Card::new("NAXIS2", cells.len() as i64));
        table.push(Card::new("PCOUNT", 0i64));
        table.push(Card::new("GCOUNT", 1i64));
        table.push(Card::new("TFIELDS", 1i64));
        table.push(Card::new("TTYPE1", "UNIQ"));
        table.push(Card::new("TFORM1", "1K"));
        table.push(Card::new("PIXTYPE", "HEALPIX"));
        table.push(Card::new("ORDERING", "NUNIQ"));
        table.push(Card::new("COORDSYS", "C"));
        table.push(Card::new("MOCORDER", self.depth as i64).with_comment("MOC resolution"));
        table.push(Card::new("MOCTOOL", "celestial-moc"));

        let mut data = vec![0u8; cells.len() * 8];
        for (chunk, cell) in data.chunks_exact_mut(8).zip(&cells) {
            BigEndian::write_i64(chunk, cell.uniq() as i64);
        }

        fits::write_hdus([(&primary, &[][..]), (&table, data.as_slice())])
    }

    pub fn write_fits(&self, path: impl AsRef<Path>) -> MocResult<()> {
        fs::write(path, self.to_fits_bytes())?;
        Ok(())
    }
}

fn declared_depth(hdus: &[Hdu<'_>]) -> MocResult<Option<u8>> {
    let table = &hdus[1].header;
    let declared = match table.optional_integer("MOCORDER")? {
        Some(order) => Some(("MOCORDER", order)),
        None => match table.optional_integer("MOCORD_S")? {
            Some(order) => Some(("MOCORD_S", order)),
            None => hdus[0]
                .header
                .optional_integer("HPXMOC")?
                .map(|order| ("HPXMOC", order)),
        },
    };
    match declared {
        None => Ok(None),
        Some((_, order)) if (0..=MAX_ORDER as i64).contains(&order) => Ok(Some(order as u8)),
        Some((keyword, order)) => Err(MocError::invalid_keyword_value(keyword, order.to_string())),
    }
}

fn read_uniq_column(table: &Hdu<'_>) -> MocResult<Vec<Cell>> {
    let header = &table.header;
    let row_width = dimension(header, "NAXIS1")?;
    let rows = dimension(header, "NAXIS2")?;
    let tfields = header.integer("TFIELDS")?;
    if tfields < 1 {
        return Err(MocError::invalid_keyword_value("TFIELDS", tfields.to_string()));
    }

    let (column, offset) = locate_uniq_column(header, tfields as usize)?;
    let tform_key = format!("TFORM{}", column);
    let tform = header
        .string(&tform_key)
        .ok_or_else(|| MocError::keyword_not_found(tform_key.clone()))?;
    let (repeat, data_type) = fits::parse_tform(tform)?;
    let width = match (repeat, data_type) {
        (1, 'J') => 4,
        (1, 'K') => 8,
        _ => return Err(MocError::invalid_keyword_value(tform_key, tform)),
    };

    let table_len = rows
        .checked_mul(row_width)
        .ok_or_else(|| MocError::invalid_format("data dimensions too large"))?;
    if offset > row_width || width > row_width - offset || table.data.len() < table_len {
        return Err(MocError::UnexpectedEof);
    }

    (0..rows)
        .map(|row| {
            let start = row * row_width + offset;
            let field = &table.data[start..start + width];
            let uniq = if width == 4 {
                BigEndian::read_i32(field) as i64
            } else {
                BigEndian::read_i64(field)
            };
            let uniq = u64::try_from(uniq)
                .map_err(|_| MocError::invalid_cell(format!("negative uniq value {}", uniq)))?;
            Cell::from_uniq(uniq)
        })
        .collect()
}

fn dimension(header: &Header, keyword: &str) -> MocResult<usize> {
    let value = header.integer(keyword)?;
    usize::try_from(value).map_err(|_| MocError::invalid_keyword_value(keyword, value.to_string()))
}

/// Find the NUNIQ column by name, defaulting to the first column, and
/// return its 1-based index with its byte offset inside a row.
fn locate_uniq_column(header: &Header, tfields: usize) -> MocResult<(usize, usize)> {
    let column = (1..=tfields)
        .find(|i| {
            header
                .string(&format!("TTYPE{}", i))
                .is_some_and(|name| {
                    UNIQ_COLUMN_NAMES
                        .iter()
                        .any(|n| n.eq_ignore_ascii_case(name.trim()))
                })
        })
        .unwrap_or(1);

    let mut offset: usize = 0;
    for i in 1..column {
        let key = format!("TFORM{}", i);
        let tform = header
            .string(&key)
            .ok_or_else(|| MocError::keyword_not_found(key.clone()))?;
        let (repeat, data_type) = fits::parse_tform(tform)?;
        offset = repeat
            .checked_mul(fits::element_size(data_type)?)
            .and_then(|width| offset.checked_add(width))
            .ok_or_else(|| MocError::invalid_format("data dimensions too large"))?;
    }
    Ok((column, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::{read_hdus, write_hdus};
    use tempfile::NamedTempFile;

    fn cell(order: u8, ipix: u64) -> Cell {
        Cell::new(order, ipix).unwrap()
    }

    /// Build a MOC file by hand with a 1J column and HPXMOC only in the
    /// primary header.
    fn legacy_fits(order: i64, uniqs: &[i32]) -> Vec<u8> {
        let mut primary = Header::new();
        primary.push(Card::new("SIMPLE", true));
        primary.push(Card::new("BITPIX", 8i64));
        primary.push(Card::new("NAXIS", 0i64));
        primary.push(Card::new("EXTEND", true));
        primary.push(Card::new("HPXMOC", order));

        let mut table = Header::new();
        table.push(Card::new("XTENSION", "BINTABLE"));
        table.push(Card::new("BITPIX", 8i64));
        table.push(Card::new("NAXIS", 2i64));
        table.push(Card::new("NAXIS1", 4i64));
        table.push(Card::new("NAXIS2", uniqs.len() as i64));
        table.push(Card::new("PCOUNT", 0i64));
        table.push(Card::new("GCOUNT", 1i64));
        table.push(Card::new("TFIELDS", 1i64));
        table.push(Card::new("TTYPE1", "NPIX"));
        table.push(Card::new("TFORM1", "1J"));

        let mut data = vec![0u8; uniqs.len() * 4];
        for (chunk, uniq) in data.chunks_exact_mut(4).zip(uniqs) {
            BigEndian::write_i32(chunk, *uniq);
        }
        write_hdus([(&primary, &[][..]), (&table, data.as_slice())])
    }

    #[test]
    fn test_contains_whole_base_face() {
        // Base face 4 is centred on (0, 0).
        let moc = Moc::from_cells([cell(0, 4)]);
        assert!(moc.contains(0.0, 0.0));
        assert!(moc.contains(10.0, 10.0));
        assert!(!moc.contains(180.0, 0.0));
        assert!(!moc.contains(0.0, 89.0));
    }

    #[test]
    fn test_contains_matches_pixel_at_depth() {
        let target = ang2pix_nest(8, 150.1, 2.2);
        let moc = Moc::from_cells([cell(8, target)]);
        assert!(moc.contains(150.1, 2.2));
        assert!(!moc.contains(150.1 + 5.0, 2.2));
    }

    #[test]
    fn test_coarse_cell_inside_deeper_moc() {
        let (lon, lat) = (10.0, 60.0);
        let coarse = ang2pix_nest(1, lon, lat);
        let deep = ang2pix_nest(10, 200.0, -30.0);
        let moc = Moc::from_cells([cell(1, coarse), cell(10, deep)]);
        assert_eq!(moc.depth(), 10);
        assert!(moc.contains(200.0, -30.0));
        assert!(moc.contains(lon, lat));
        assert!(moc.contains(lon + 0.5, lat + 0.5));
        assert!(!moc.contains(200.0, 30.0));
    }

    #[test]
    fn test_new_rejects_cell_deeper_than_depth() {
        assert!(Moc::new(3, [cell(4, 0)]).is_err());
        assert!(Moc::new(30, []).is_err());
        assert!(Moc::new(5, [cell(4, 0)]).is_ok());
    }

    #[test]
    fn test_sky_fraction() {
        let moc = Moc::from_cells([cell(0, 0), cell(0, 1), cell(0, 2)]);
        assert!((moc.sky_fraction() - 0.25).abs() < 1e-12);
        assert_eq!(Moc::from_cells([]).sky_fraction(), 0.0);
    }

    #[test]
    fn test_fits_encoding_decodes_to_same_region() {
        let moc = Moc::new(7, [cell(0, 11), cell(3, 17), cell(7, 40_000)]).unwrap();
        let decoded = Moc::from_fits_bytes(&moc.to_fits_bytes()).unwrap();
        assert_eq!(decoded, moc);
        assert_eq!(decoded.depth(), 7);
    }

    #[test]
    fn test_fits_encoding_layout() {
        let moc = Moc::from_cells([cell(2, 5)]);
        let bytes = moc.to_fits_bytes();
        assert_eq!(bytes.len() % fits::BLOCK_SIZE, 0);
        let hdus = read_hdus(&bytes).unwrap();
        assert_eq!(hdus.len(), 2);
        assert_eq!(hdus[1].header.string("ORDERING"), Some("NUNIQ"));
        assert_eq!(hdus[1].header.integer("MOCORDER").unwrap(), 2);
        assert_eq!(BigEndian::read_i64(hdus[1].data), cell(2, 5).uniq() as i64);
    }

    #[test]
    fn test_legacy_file_uses_hpxmoc() {
        let uniq = cell(0, 4).uniq() as i32;
        let moc = Moc::from_fits_bytes(&legacy_fits(6, &[uniq])).unwrap();
        assert_eq!(moc.depth(), 6);
        assert!(moc.contains(0.0, 0.0));
    }

    #[test]
    fn test_declared_order_shallower_than_cells_fails() {
        let uniq = cell(5, 3).uniq() as i32;
        let result = Moc::from_fits_bytes(&legacy_fits(2, &[uniq]));
        assert!(matches!(result, Err(MocError::InvalidFormat(_))));
    }

    #[test]
    fn test_negative_uniq_fails() {
        let result = Moc::from_fits_bytes(&legacy_fits(3, &[-5]));
        assert!(matches!(result, Err(MocError::InvalidCell { .. })));
    }

    #[test]
    fn test_primary_only_file_fails() {
        let mut primary = Header::new();
        primary.push(Card::new("SIMPLE", true));
        primary.push(Card::new("BITPIX", 8i64));
        primary.push(Card::new("NAXIS", 0i64));
        let bytes = write_hdus([(&primary, &[][..])]);
        assert!(matches!(
            Moc::from_fits_bytes(&bytes),
            Err(MocError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_oversized_table_group_count_fails() {
        let bytes = Moc::from_cells([cell(0, 4)]).to_fits_bytes();
        let hdus = read_hdus(&bytes).unwrap();
        let mut table = hdus[1].header.clone();
        table.set("GCOUNT", 1i64 << 62);
        let corrupt = write_hdus([(&hdus[0].header, hdus[0].data), (&table, hdus[1].data)]);
        assert!(matches!(
            Moc::from_fits_bytes(&corrupt),
            Err(MocError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(Moc::from_fits_bytes(b"not a fits file").is_err());
    }

    #[test]
    fn test_open_and_write_file() {
        let moc = Moc::from_cells([cell(0, 4), cell(4, 2000)]);
        let file = NamedTempFile::new().unwrap();
        moc.write_fits(file.path()).unwrap();
        let reopened = Moc::open(file.path()).unwrap();
        assert_eq!(reopened, moc);
    }

    #[test]
    fn test_open_empty_file_fails() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            Moc::open(file.path()),
            Err(MocError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let result = Moc::open("/nonexistent/coverage.fits");
        assert!(matches!(result, Err(MocError::Io(_))));
    }

    #[test]
    fn test_empty_moc_contains_nothing() {
        let moc = Moc::from_cells([]);
        let decoded = Moc::from_fits_bytes(&moc.to_fits_bytes()).unwrap();
        assert!(decoded.is_empty());
        assert!(!decoded.contains(0.0, 0.0));
    }
}
