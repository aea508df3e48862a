//! Renders a [RegionDist] as KML, one extruded box per region with a height
//! and colour depending on the probability.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use crate::article::table::ArticleTable;
use crate::coord::Coord;
use crate::errors::KmlError;
use crate::region::StatRegionTable;
use crate::region_dist::RegionDist;

const KML_MAX_HEIGHT: f64 = 2_000_000.0;
const KML_MIN_COLOR: [f64; 3] = [255.0, 255.0, 0.0];
const KML_MAX_COLOR: [f64; 3] = [255.0, 0.0, 0.0];

/// Applied to the probabilities before they are scaled to heights and colours.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, AsRefStr, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KmlTransform {
    #[default]
    None,
    Log,
    #[strum(serialize = "logsquared")]
    #[serde(rename = "logsquared")]
    LogSquared,
}

impl KmlTransform {
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            KmlTransform::None => x,
            KmlTransform::Log => x.ln(),
            KmlTransform::LogSquared => -x.ln() * x.ln(),
        }
    }
}

struct KmlWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> KmlWriter<W> {
    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), KmlError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<(), KmlError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn leaf(&mut self, name: &str, text: &str) -> Result<(), KmlError> {
        self.start(name, &[])?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn empty(&mut self, name: &str) -> Result<(), KmlError> {
        self.writer.write_event(Event::Empty(BytesStart::new(name)))?;
        Ok(())
    }
}

fn midpoint(a: &Coord, b: &Coord) -> Coord {
    Coord::new((a.lat + b.lat) / 2.0, (a.long + b.long) / 2.0)
}

fn color_for(fracprob: f64) -> String {
    let mut color = [0u8; 3];
    for (i, c) in color.iter_mut().enumerate() {
        *c = (KML_MIN_COLOR[i] + fracprob * (KML_MAX_COLOR[i] - KML_MIN_COLOR[i])) as u8;
    }
    format!("ff{:02x}{:02x}{:02x}", color[2], color[1], color[0])
}

/// Writes the KML document for a normalized distribution.
pub fn write_kml<W: Write>(
    inner: W,
    dist: &RegionDist,
    regions: &StatRegionTable,
    articles: &ArticleTable,
    transform: KmlTransform,
) -> Result<W, KmlError> {
    if !dist.normalized {
        return Err(KmlError::NotNormalized(dist.word.clone()));
    }
    let transformed: Vec<f64> = dist.region_probs.iter().map(|(_, p)| transform.apply(*p)).collect();
    let min = transformed.iter().copied().fold(f64::INFINITY, f64::min);
    let max = transformed.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut kml = KmlWriter { writer: Writer::new_with_indent(inner, b' ', 2) };
    kml.writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    kml.start("kml", &[
        ("xmlns", "http://www.opengis.net/kml/2.2"),
        ("xmlns:gx", "http://www.google.com/kml/ext/2.2"),
        ("xmlns:kml", "http://www.opengis.net/kml/2.2"),
        ("xmlns:atom", "http://www.w3.org/2005/Atom"),
    ])?;
    kml.start("Document", &[])?;

    kml.start("Style", &[("id", "bar")])?;
    kml.start("PolyStyle", &[])?;
    kml.leaf("outline", "0")?;
    kml.end("PolyStyle")?;
    kml.start("IconStyle", &[])?;
    kml.empty("Icon")?;
    kml.end("IconStyle")?;
    kml.end("Style")?;

    kml.start("Style", &[("id", "downArrowIcon")])?;
    kml.start("IconStyle", &[])?;
    kml.start("Icon", &[])?;
    kml.leaf("href", "http://maps.google.com/mapfiles/kml/pal4/icon28.png")?;
    kml.end("Icon")?;
    kml.end("IconStyle")?;
    kml.end("Style")?;

    kml.start("Folder", &[])?;
    kml.leaf("name", &dist.word)?;
    kml.leaf("open", "1")?;
    kml.leaf("description", &format!("Region distribution for word '{}'", dist.word))?;
    kml.start("LookAt", &[])?;
    kml.leaf("latitude", "42")?;
    kml.leaf("longitude", "-102")?;
    kml.leaf("altitude", "0")?;
    kml.leaf("range", "5000000")?;
    kml.leaf("tilt", "53.454348562403")?;
    kml.leaf("heading", "0")?;
    kml.end("LookAt")?;

    let grid = regions.grid();
    for (((latind, longind), _), xformed) in dist.region_probs.iter().zip(transformed) {
        let (latind, longind) = (*latind, *longind);
        let fracprob = if max > min { (xformed - min) / (max - min) } else { 0.0 };
        let sw = grid.stat_region_indices_to_near_corner_coord(latind, longind);
        let ne = grid.stat_region_indices_to_far_corner_coord(latind, longind);
        let nw = Coord::new(ne.lat, sw.long);
        let se = Coord::new(sw.lat, ne.long);
        let center = grid.stat_region_indices_to_center_coord(latind, longind);
        let mut coordtext = String::from("\n");
        for corner in [sw, nw, ne, se, sw] {
            let mid = midpoint(&center, &corner);
            coordtext.push_str(&format!("{},{},{}\n", mid.long, mid.lat, fracprob * KML_MAX_HEIGHT));
        }
        let name = regions
            .region_at(&(latind, longind))
            .most_popular_article
            .map(|id| articles.get(id).title.as_str())
            .unwrap_or("");

        kml.start("Placemark", &[])?;
        kml.leaf("name", name)?;
        kml.start("Region", &[])?;
        kml.start("LatLonAltBox", &[])?;
        kml.leaf("north", &midpoint(&center, &ne).lat.to_string())?;
        kml.leaf("south", &midpoint(&center, &sw).lat.to_string())?;
        kml.leaf("east", &midpoint(&center, &ne).long.to_string())?;
        kml.leaf("west", &midpoint(&center, &sw).long.to_string())?;
        kml.end("LatLonAltBox")?;
        kml.start("Lod", &[])?;
        kml.leaf("minLodPixels", "16")?;
        kml.end("Lod")?;
        kml.end("Region")?;
        kml.leaf("styleURL", "#bar")?;
        kml.start("Point", &[])?;
        kml.leaf("coordinates", &format!("{},{}", center.long, center.lat))?;
        kml.end("Point")?;
        kml.end("Placemark")?;

        kml.start("Placemark", &[])?;
        kml.leaf("name", &format!("{name} POLYGON"))?;
        kml.leaf("styleUrl", "#bar")?;
        kml.start("Style", &[])?;
        kml.start("PolyStyle", &[])?;
        kml.leaf("color", &color_for(fracprob))?;
        kml.leaf("colorMode", "normal")?;
        kml.end("PolyStyle")?;
        kml.end("Style")?;
        kml.start("Polygon", &[])?;
        kml.leaf("extrude", "1")?;
        kml.leaf("tessellate", "1")?;
        kml.leaf("altitudeMode", "relativeToGround")?;
        kml.start("outerBoundaryIs", &[])?;
        kml.start("LinearRing", &[])?;
        kml.leaf("coordinates", &coordtext)?;
        kml.end("LinearRing")?;
        kml.end("outerBoundaryIs")?;
        kml.end("Polygon")?;
        kml.end("Placemark")?;
    }

    kml.end("Folder")?;
    kml.end("Document")?;
    kml.end("kml")?;
    Ok(kml.writer.into_inner())
}

/// The KML document as a string.
pub fn generate_kml(
    dist: &RegionDist,
    regions: &StatRegionTable,
    articles: &ArticleTable,
    transform: KmlTransform,
) -> Result<String, KmlError> {
    let bytes = write_kml(Vec::new(), dist, regions, articles, transform)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn write_kml_file(
    path: impl AsRef<Path>,
    dist: &RegionDist,
    regions: &StatRegionTable,
    articles: &ArticleTable,
    transform: KmlTransform,
) -> Result<(), KmlError> {
    let file = BufWriter::new(File::create(path)?);
    let mut file = write_kml(file, dist, regions, articles, transform)?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::errors::KmlError;
    use crate::kml::{color_for, generate_kml, write_kml_file, KmlTransform};
    use crate::region::test::world;
    use crate::region_dist::RegionDist;

    #[test]
    fn transforms(){
        assert_relative_eq!(0.25, KmlTransform::None.apply(0.25));
        assert_relative_eq!(0.25f64.ln(), KmlTransform::Log.apply(0.25));
        assert_relative_eq!(-(0.25f64.ln().powi(2)), KmlTransform::LogSquared.apply(0.25));
        assert_eq!(KmlTransform::LogSquared, "logsquared".parse().unwrap());
        assert_eq!("ff00ffff", color_for(0.0));
        assert_eq!("ff0000ff", color_for(1.0));
    }

    #[test]
    fn kml_has_two_placemarks_per_region(){
        let (mut table, stats, mut regions) = world(1);
        regions.initialize_regions(&mut table, &stats, false).unwrap();
        let dist = RegionDist::for_word("france", &regions, &stats);
        let kml = generate_kml(&dist, &regions, &table, KmlTransform::None).unwrap();
        assert!(kml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(kml.contains("<name>france</name>"));
        assert!(kml.contains("<description>Region distribution for word &apos;france&apos;</description>")
            || kml.contains("<description>Region distribution for word 'france'</description>"));
        assert_eq!(6, kml.matches("<Placemark>").count());
        assert!(kml.contains("<name>Paris</name>"));
        assert!(kml.contains("<name>Paris POLYGON</name>"));
        // france is most probable around paris
        assert!(kml.contains("<color>ff0000ff</color>"));
        assert!(kml.contains("<tilt>53.454348562403</tilt>"));
        assert!(kml.contains("<coordinates>2.5,47.5</coordinates>"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("france.kml");
        write_kml_file(&path, &dist, &regions, &table, KmlTransform::Log).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<styleURL>#bar</styleURL>"));
    }

    #[test]
    fn unnormalized_distributions_are_refused(){
        let (table, _, regions) = world(1);
        let dist = RegionDist { word: "nowhere".to_string(), ..Default::default() };
        assert!(matches!(
            generate_kml(&dist, &regions, &table, KmlTransform::None),
            Err(KmlError::NotNormalized(word)) if word == "nowhere"
        ));
    }
}
