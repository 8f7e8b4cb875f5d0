//! Maidenhead locator computation

/// Compute the six-character Maidenhead locator for a station position.
/// Out-of-range coordinates yield the null locator "AA00AA".
pub fn locator(latitude: f32, longitude: f32) -> String {
    if !(-90.0..=90.0).contains(&latitude) {
        return "AA00AA".to_string();
    }
    if !(-360.0..=360.0).contains(&longitude) {
        return "AA00AA".to_string();
    }

    let mut lat = latitude + 90.0;
    let mut lon = longitude;
    if lon > 180.0 {
        lon -= 360.0;
    }
    if lon < -180.0 {
        lon += 360.0;
    }
    let mut lon = lon + 180.0;

    let mut out = String::with_capacity(6);

    let field_lon = (lon / 20.0).floor();
    let field_lat = (lat / 10.0).floor();
    out.push((b'A' + field_lon as u8) as char);
    out.push((b'A' + field_lat as u8) as char);
    lon -= field_lon * 20.0;
    lat -= field_lat * 10.0;

    let square_lon = (lon / 2.0).floor();
    let square_lat = lat.floor();
    out.push((b'0' + square_lon as u8) as char);
    out.push((b'0' + square_lat as u8) as char);
    lon -= square_lon * 2.0;
    lat -= square_lat;

    let sub_lon = (lon / (2.0 / 24.0)).floor();
    let sub_lat = (lat / (1.0 / 24.0)).floor();
    out.push((b'A' + sub_lon as u8) as char);
    out.push((b'A' + sub_lat as u8) as char);

    out
}
