//! Ordnance Survey National Grid (Great Britain).
//!
//! References are two 100 km square letters followed by an even number of
//! digits (`SU1234`), a 2 km tetrad letter (`SU13Z`) or a 5 km quadrant
//! (`SU13NE`). Precision is the cell size in metres.
//!
//! WGS84 coordinates are moved onto the OSGB36 datum with a seven-parameter
//! Helmert transform and projected with the National Grid transverse
//! Mercator. Accuracy is a few metres, which is below the smallest cell a
//! field fix supports.

use std::f64::consts::PI;

use super::grid::{GridError, GridSystem, LatLon};

/// Cell sizes offered for display, in metres.
pub const OS_GRID_PRECISIONS: [usize; 7] = [1, 10, 100, 1000, 2000, 5000, 10000];

const TETRAD_LETTERS: &[u8; 25] = b"ABCDEFGHIJKLMNPQRSTUVWXYZ";
const SQUARE_LETTERS: &str = "HJNOST";

const MAX_EASTING: f64 = 700_000.0;
const MAX_NORTHING: f64 = 1_300_000.0;

struct Ellipsoid {
    a: f64,
    b: f64,
}

impl Ellipsoid {
    fn e2(&self) -> f64 {
        (self.a * self.a - self.b * self.b) / (self.a * self.a)
    }
}

const AIRY_1830: Ellipsoid = Ellipsoid {
    a: 6_377_563.396,
    b: 6_356_256.909,
};
const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    b: 6_356_752.314_245,
};

// National Grid true origin
const F0: f64 = 0.999_601_271_7;
const PHI0_DEG: f64 = 49.0;
const LAMBDA0_DEG: f64 = -2.0;
const E0: f64 = 400_000.0;
const N0: f64 = -100_000.0;

/// WGS84 to OSGB36: translation (m), scale (ppm), rotation (arc seconds).
struct Helmert {
    tx: f64,
    ty: f64,
    tz: f64,
    s: f64,
    rx: f64,
    ry: f64,
    rz: f64,
}

const WGS84_TO_OSGB36: Helmert = Helmert {
    tx: -446.448,
    ty: 125.157,
    tz: -542.060,
    s: 20.4894,
    rx: -0.1502,
    ry: -0.2470,
    rz: -0.8421,
};

impl Helmert {
    fn inverse(&self) -> Self {
        Self {
            tx: -self.tx,
            ty: -self.ty,
            tz: -self.tz,
            s: -self.s,
            rx: -self.rx,
            ry: -self.ry,
            rz: -self.rz,
        }
    }

    fn apply(&self, (x, y, z): (f64, f64, f64)) -> (f64, f64, f64) {
        let s = 1.0 + self.s * 1e-6;
        let arcsec = PI / (180.0 * 3600.0);
        let (rx, ry, rz) = (self.rx * arcsec, self.ry * arcsec, self.rz * arcsec);
        (
            self.tx + s * x - rz * y + ry * z,
            self.ty + rz * x + s * y - rx * z,
            self.tz - ry * x + rx * y + s * z,
        )
    }
}

fn to_cartesian(phi: f64, lambda: f64, ellipsoid: &Ellipsoid) -> (f64, f64, f64) {
    let e2 = ellipsoid.e2();
    let nu = ellipsoid.a / (1.0 - e2 * phi.sin().powi(2)).sqrt();
    (
        nu * phi.cos() * lambda.cos(),
        nu * phi.cos() * lambda.sin(),
        (1.0 - e2) * nu * phi.sin(),
    )
}

fn from_cartesian((x, y, z): (f64, f64, f64), ellipsoid: &Ellipsoid) -> (f64, f64) {
    let e2 = ellipsoid.e2();
    let p = (x * x + y * y).sqrt();
    let mut phi = z.atan2(p * (1.0 - e2));
    for _ in 0..10 {
        let nu = ellipsoid.a / (1.0 - e2 * phi.sin().powi(2)).sqrt();
        let next = (z + e2 * nu * phi.sin()).atan2(p);
        let done = (next - phi).abs() < 1e-12;
        phi = next;
        if done {
            break;
        }
    }
    (phi, y.atan2(x))
}

/// Meridional arc from the true origin latitude.
fn meridional_arc(phi: f64) -> f64 {
    let (a, b) = (AIRY_1830.a, AIRY_1830.b);
    let n = (a - b) / (a + b);
    let (n2, n3) = (n * n, n * n * n);
    let phi0 = PHI0_DEG.to_radians();
    let (d, s) = (phi - phi0, phi + phi0);
    b * F0
        * ((1.0 + n + 1.25 * n2 + 1.25 * n3) * d
            - (3.0 * n + 3.0 * n2 + 2.625 * n3) * d.sin() * s.cos()
            + (1.875 * n2 + 1.875 * n3) * (2.0 * d).sin() * (2.0 * s).cos()
            - (35.0 / 24.0) * n3 * (3.0 * d).sin() * (3.0 * s).cos())
}

/// Radii of curvature (nu, rho) and eta squared at a latitude.
fn curvature(phi: f64) -> (f64, f64, f64) {
    let e2 = AIRY_1830.e2();
    let sin2 = phi.sin().powi(2);
    let nu = AIRY_1830.a * F0 / (1.0 - e2 * sin2).sqrt();
    let rho = AIRY_1830.a * F0 * (1.0 - e2) / (1.0 - e2 * sin2).powf(1.5);
    (nu, rho, nu / rho - 1.0)
}

/// WGS84 degrees to National Grid easting and northing in metres.
fn to_easting_northing(lat: f64, lon: f64) -> (f64, f64) {
    let cartesian = to_cartesian(lat.to_radians(), lon.to_radians(), &WGS84);
    let (phi, lambda) = from_cartesian(WGS84_TO_OSGB36.apply(cartesian), &AIRY_1830);

    let (nu, rho, eta2) = curvature(phi);
    let (sin, cos, tan) = (phi.sin(), phi.cos(), phi.tan());
    let tan2 = tan * tan;
    let tan4 = tan2 * tan2;

    let i = meridional_arc(phi) + N0;
    let ii = nu / 2.0 * sin * cos;
    let iii = nu / 24.0 * sin * cos.powi(3) * (5.0 - tan2 + 9.0 * eta2);
    let iiia = nu / 720.0 * sin * cos.powi(5) * (61.0 - 58.0 * tan2 + tan4);
    let iv = nu * cos;
    let v = nu / 6.0 * cos.powi(3) * (nu / rho - tan2);
    let vi = nu / 120.0
        * cos.powi(5)
        * (5.0 - 18.0 * tan2 + tan4 + 14.0 * eta2 - 58.0 * tan2 * eta2);

    let dl = lambda - LAMBDA0_DEG.to_radians();
    let northing = i + ii * dl.powi(2) + iii * dl.powi(4) + iiia * dl.powi(6);
    let easting = E0 + iv * dl + v * dl.powi(3) + vi * dl.powi(5);
    (easting, northing)
}

/// National Grid easting and northing to WGS84 degrees.
fn to_lat_lon(easting: f64, northing: f64) -> LatLon {
    let mut phi = PHI0_DEG.to_radians();
    let mut m = 0.0;
    for _ in 0..100 {
        phi += (northing - N0 - m) / (AIRY_1830.a * F0);
        m = meridional_arc(phi);
        if (northing - N0 - m).abs() < 1e-5 {
            break;
        }
    }

    let (nu, rho, eta2) = curvature(phi);
    let tan = phi.tan();
    let (tan2, tan4) = (tan * tan, tan.powi(4));
    let sec = 1.0 / phi.cos();

    let vii = tan / (2.0 * rho * nu);
    let viii = tan / (24.0 * rho * nu.powi(3)) * (5.0 + 3.0 * tan2 + eta2 - 9.0 * tan2 * eta2);
    let ix = tan / (720.0 * rho * nu.powi(5)) * (61.0 + 90.0 * tan2 + 45.0 * tan4);
    let x = sec / nu;
    let xi = sec / (6.0 * nu.powi(3)) * (nu / rho + 2.0 * tan2);
    let xii = sec / (120.0 * nu.powi(5)) * (5.0 + 28.0 * tan2 + 24.0 * tan4);
    let xiia = sec / (5040.0 * nu.powi(7))
        * (61.0 + 662.0 * tan2 + 1320.0 * tan4 + 720.0 * tan.powi(6));

    let de = easting - E0;
    let phi = phi - vii * de.powi(2) + viii * de.powi(4) - ix * de.powi(6);
    let lambda = LAMBDA0_DEG.to_radians() + x * de - xi * de.powi(3) + xii * de.powi(5)
        - xiia * de.powi(7);

    let cartesian = to_cartesian(phi, lambda, &AIRY_1830);
    let (phi, lambda) = from_cartesian(WGS84_TO_OSGB36.inverse().apply(cartesian), &WGS84);
    LatLon::new(phi.to_degrees(), lambda.to_degrees())
}

/// South-west corner and size of a grid cell, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    easting: f64,
    northing: f64,
    size: usize,
}

fn square_letters(easting: f64, northing: f64) -> Option<String> {
    let e100k = (easting / 100_000.0).floor() as i64;
    let n100k = (northing / 100_000.0).floor() as i64;
    if !(0..7).contains(&e100k) || !(0..13).contains(&n100k) {
        return None;
    }
    let mut l1 = (19 - n100k) - (19 - n100k) % 5 + (e100k + 10) / 5;
    let mut l2 = ((19 - n100k) * 5) % 25 + e100k % 5;
    // The grid alphabet has no I
    if l1 > 7 {
        l1 += 1;
    }
    if l2 > 7 {
        l2 += 1;
    }
    let letter = |i: i64| char::from(b'A' + i as u8);
    Some(format!("{}{}", letter(l1), letter(l2)))
}

fn square_origin(first: char, second: char) -> Option<(f64, f64)> {
    if !SQUARE_LETTERS.contains(first) || !second.is_ascii_uppercase() || second == 'I' {
        return None;
    }
    let index = |c: char| {
        let i = c as i64 - 'A' as i64;
        if i > 7 {
            i - 1
        } else {
            i
        }
    };
    let (l1, l2) = (index(first), index(second));
    let e100k = (l1 - 2).rem_euclid(5) * 5 + l2 % 5;
    let n100k = (19 - (l1 / 5) * 5) - l2 / 5;
    if !(0..7).contains(&e100k) || !(0..13).contains(&n100k) {
        return None;
    }
    Some((e100k as f64 * 100_000.0, n100k as f64 * 100_000.0))
}

fn parse_cell(reference: &str) -> Result<Cell, GridError> {
    let invalid = || GridError::InvalidReference(reference.to_string());
    let compact: String = reference.chars().filter(|c| !c.is_whitespace()).collect();
    let mut chars = compact.chars();
    let (Some(first), Some(second)) = (chars.next(), chars.next()) else {
        return Err(invalid());
    };
    let (east0, north0) = square_origin(first, second).ok_or_else(invalid)?;
    let rest = chars.as_str();
    if !rest.is_ascii() {
        return Err(invalid());
    }

    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let number = |s: &str| s.parse::<f64>().map_err(|_| invalid());

    if rest.len() == 4 && digits(&rest[..2]) && !digits(&rest[2..]) {
        // 10 km square plus quadrant
        let (e, n) = (number(&rest[..1])?, number(&rest[1..2])?);
        let (dn, de) = match &rest[2..] {
            "SW" => (0.0, 0.0),
            "NW" => (5000.0, 0.0),
            "SE" => (0.0, 5000.0),
            "NE" => (5000.0, 5000.0),
            _ => return Err(invalid()),
        };
        return Ok(Cell {
            easting: east0 + e * 10_000.0 + de,
            northing: north0 + n * 10_000.0 + dn,
            size: 5000,
        });
    }
    if rest.len() == 3 && digits(&rest[..2]) {
        // 10 km square plus tetrad letter
        let (e, n) = (number(&rest[..1])?, number(&rest[1..2])?);
        let letter = rest.as_bytes()[2];
        let index = TETRAD_LETTERS
            .iter()
            .position(|&l| l == letter)
            .ok_or_else(invalid)?;
        return Ok(Cell {
            easting: east0 + e * 10_000.0 + (index / 5) as f64 * 2000.0,
            northing: north0 + n * 10_000.0 + (index % 5) as f64 * 2000.0,
            size: 2000,
        });
    }
    if rest.is_empty() || rest.len() % 2 != 0 || rest.len() > 10 || !digits(rest) {
        return Err(invalid());
    }
    let half = rest.len() / 2;
    let size = 10usize.pow(5 - half as u32);
    Ok(Cell {
        easting: east0 + number(&rest[..half])? * size as f64,
        northing: north0 + number(&rest[half..])? * size as f64,
        size,
    })
}

fn format_cell(easting: f64, northing: f64, precision: usize) -> Option<String> {
    let letters = square_letters(easting, northing)?;
    let (e, n) = (easting.rem_euclid(100_000.0), northing.rem_euclid(100_000.0));
    let reference = match precision {
        2000 => {
            let (e10, n10) = ((e / 10_000.0) as usize, (n / 10_000.0) as usize);
            let column = ((e % 10_000.0) / 2000.0) as usize;
            let row = ((n % 10_000.0) / 2000.0) as usize;
            let tetrad = char::from(TETRAD_LETTERS[column * 5 + row]);
            format!("{letters}{e10}{n10}{tetrad}")
        }
        5000 => {
            let (e10, n10) = ((e / 10_000.0) as usize, (n / 10_000.0) as usize);
            let north = if n % 10_000.0 >= 5000.0 { 'N' } else { 'S' };
            let east = if e % 10_000.0 >= 5000.0 { 'E' } else { 'W' };
            format!("{letters}{e10}{n10}{north}{east}")
        }
        size => {
            let width = 5 - size.ilog10() as usize;
            let (e, n) = ((e / size as f64) as usize, (n / size as f64) as usize);
            format!("{letters}{e:0width$}{n:0width$}")
        }
    };
    Some(reference)
}

/// Ordnance Survey National Grid for Great Britain.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsGrid;

impl OsGrid {
    fn check_precision(precision: usize) -> Result<(), GridError> {
        if OS_GRID_PRECISIONS.contains(&precision) {
            Ok(())
        } else {
            Err(GridError::InvalidPrecision(precision))
        }
    }
}

impl GridSystem for OsGrid {
    fn reference_at(&self, lat: f64, lon: f64, precision: usize) -> Result<String, GridError> {
        Self::check_precision(precision)?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(GridError::InvalidCoordinate { lat, lon });
        }
        let (easting, northing) = to_easting_northing(lat, lon);
        if !(0.0..MAX_EASTING).contains(&easting) || !(0.0..MAX_NORTHING).contains(&northing) {
            return Err(GridError::InvalidCoordinate { lat, lon });
        }
        format_cell(easting, northing, precision).ok_or(GridError::InvalidCoordinate { lat, lon })
    }

    fn precision_of(&self, reference: &str) -> Result<usize, GridError> {
        Ok(parse_cell(reference)?.size)
    }

    fn centroid_of(&self, reference: &str) -> Result<LatLon, GridError> {
        let cell = parse_cell(reference)?;
        let half = cell.size as f64 / 2.0;
        Ok(to_lat_lon(cell.easting + half, cell.northing + half))
    }

    fn cell_polygon(&self, reference: &str) -> Result<Vec<LatLon>, GridError> {
        let cell = parse_cell(reference)?;
        let size = cell.size as f64;
        let (e, n) = (cell.easting, cell.northing);
        Ok(vec![
            to_lat_lon(e, n),
            to_lat_lon(e, n + size),
            to_lat_lon(e + size, n + size),
            to_lat_lon(e + size, n),
        ])
    }

    fn precisions(&self) -> Vec<usize> {
        OS_GRID_PRECISIONS.to_vec()
    }

    fn name(&self) -> &'static str {
        "osgr"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_letters_roundtrip() {
        assert_eq!(square_letters(441_800.0, 111_900.0).as_deref(), Some("SU"));
        assert_eq!(square_letters(325_100.0, 673_400.0).as_deref(), Some("NT"));
        assert_eq!(square_origin('S', 'U'), Some((400_000.0, 100_000.0)));
        assert_eq!(square_origin('N', 'T'), Some((300_000.0, 600_000.0)));
        assert_eq!(square_origin('T', 'Q'), Some((500_000.0, 100_000.0)));
        assert_eq!(square_origin('A', 'A'), None);
    }

    #[test]
    fn test_known_places() {
        // Southampton and Edinburgh
        assert_eq!(OsGrid.reference_at(50.9097, -1.4044, 10000).unwrap(), "SU41");
        assert_eq!(OsGrid.reference_at(55.9486, -3.1999, 10000).unwrap(), "NT27");
    }

    #[test]
    fn test_projection_roundtrip() {
        let (e, n) = to_easting_northing(52.2, -1.5);
        let back = to_lat_lon(e, n);
        assert!((back.lat - 52.2).abs() < 1e-6, "{back:?}");
        assert!((back.lon + 1.5).abs() < 1e-6, "{back:?}");
    }

    #[test]
    fn test_precision_of_every_form() {
        assert_eq!(OsGrid.precision_of("SU1234").unwrap(), 1000);
        assert_eq!(OsGrid.precision_of("SU 123 456").unwrap(), 100);
        assert_eq!(OsGrid.precision_of("SU1234512345").unwrap(), 1);
        assert_eq!(OsGrid.precision_of("SU13").unwrap(), 10000);
        assert_eq!(OsGrid.precision_of("SU13Z").unwrap(), 2000);
        assert_eq!(OsGrid.precision_of("SU13NE").unwrap(), 5000);
    }

    #[test]
    fn test_rejects_bad_references() {
        for bad in ["", "S", "SU", "SU123", "SU13O", "SU13NX", "AA1234", "su1234", "gcpvj0"] {
            assert!(OsGrid.precision_of(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_cell_encoding() {
        assert_eq!(format_cell(412_500.0, 134_500.0, 100).unwrap(), "SU125345");
        assert_eq!(format_cell(412_500.0, 134_500.0, 1000).unwrap(), "SU1234");
        assert_eq!(format_cell(412_500.0, 134_500.0, 2000).unwrap(), "SU13H");
        assert_eq!(format_cell(412_500.0, 136_500.0, 5000).unwrap(), "SU13NW");
        assert_eq!(format_cell(412_500.0, 134_500.0, 10000).unwrap(), "SU13");
    }

    #[test]
    fn test_tetrad_and_quadrant_cells() {
        let tetrad = parse_cell("SU13G").unwrap();
        assert_eq!((tetrad.easting, tetrad.northing), (412_000.0, 132_000.0));
        let quadrant = parse_cell("SU13NE").unwrap();
        assert_eq!((quadrant.easting, quadrant.northing), (415_000.0, 135_000.0));
    }

    #[test]
    fn test_centroid_stays_in_cell() {
        let centroid = OsGrid.centroid_of("SU1234").unwrap();
        assert_eq!(
            OsGrid.reference_at(centroid.lat, centroid.lon, 1000).unwrap(),
            "SU1234"
        );
        assert_eq!(
            OsGrid.reference_at(centroid.lat, centroid.lon, 100).unwrap(),
            "SU125345"
        );
    }

    #[test]
    fn test_outside_grid() {
        assert!(matches!(
            OsGrid.reference_at(48.85, 2.35, 1000),
            Err(GridError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            OsGrid.reference_at(51.5, -0.1, 50),
            Err(GridError::InvalidPrecision(50))
        ));
    }
}
