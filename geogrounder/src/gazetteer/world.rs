//! The World Gazetteer format: tab separated lines of
//! `id name altnames orig_script_name type population lat long div1 div2 div3`
//! with coordinates in hundredths of a degree.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;
use geogrounder_toolkit::status::StatusMessage;
use crate::article::table::ArticleTable;
use crate::coord::Coord;
use crate::errors::ReadError;
use crate::gazetteer::{Gazetteer, Locality};
use crate::region::StatRegionTable;

/// One parsed line of the gazetteer.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldGazetteerEntry {
    pub id: String,
    pub name: String,
    pub altnames: Vec<String>,
    pub orig_script_name: String,
    pub kind: String,
    pub population: String,
    pub coord: Coord,
    pub divs: [String; 3],
}

impl WorldGazetteerEntry {
    /// Parses a line, missing fields are empty. Lines without usable coordinates yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.trim().split('\t').map(str::trim);
        let mut next = || fields.next().unwrap_or("").to_string();
        let id = next();
        let name = next();
        let altnames = next();
        let orig_script_name = next();
        let kind = next();
        let population = next();
        let lat = next();
        let long = next();
        let divs = [next(), next(), next()];

        if lat.is_empty() || long.is_empty() {
            log::trace!("Skipping location {name} (div {}) without coordinates", divs.join("/"));
            return None;
        }
        if lat == "0" && long == "9999" {
            log::trace!("Skipping location {name} (div {}) with bad coordinates", divs.join("/"));
            return None;
        }
        let (lat, long) = match (lat.parse::<i64>(), long.parse::<i64>()) {
            (Ok(lat), Ok(long)) => (lat, long),
            _ => {
                log::warn!("Skipping location {name} with unparsable coordinates {lat},{long}");
                return None;
            }
        };
        Some(Self {
            id,
            name,
            altnames: if altnames.is_empty() {
                Vec::new()
            } else {
                altnames.split(", ").map(str::to_string).collect()
            },
            orig_script_name,
            kind,
            population,
            coord: Coord::new(lat as f64 / 100.0, long as f64 / 100.0),
            divs,
        })
    }

    pub fn into_locality(self) -> (Locality, [String; 3]) {
        let mut loc = Locality::new(self.name, self.coord);
        loc.altnames = self.altnames;
        loc.kind = self.kind;
        (loc, self.divs)
    }
}

/// Reads the gazetteer, stores every entry and matches it with an article.
/// Afterwards the divisions are finished, see [Gazetteer::finish_all].
pub fn read_world_gazetteer_and_match(
    path: impl AsRef<Path>,
    gazetteer: &mut Gazetteer,
    articles: &mut ArticleTable,
    regions: &StatRegionTable,
    max_dist_for_close_match: f64,
    max_time: Option<Duration>,
) -> Result<usize, ReadError> {
    let path = path.as_ref();
    log::info!("Matching gazetteer entries in {}...", path.display());
    let file = File::open(path).map_err(|source| ReadError::Open { path: path.to_path_buf(), source })?;
    let mut status = StatusMessage::new("gazetteer entry").with_max_time(max_time);
    for line in BufReader::new(file).lines() {
        let line = line?;
        if let Some(entry) = WorldGazetteerEntry::parse(&line) {
            let (loc, divs) = entry.into_locality();
            let id = gazetteer.add_locality(loc, &divs);
            gazetteer.match_locality(articles, id, max_dist_for_close_match);
        }
        if status.item_processed() {
            break;
        }
    }
    gazetteer.finish_all(articles, regions);
    log::info!("Finished matching {} gazetteer entries.", status.num_processed());
    Ok(status.num_processed())
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use crate::article::table::ArticleTable;
    use crate::article::{Article, Split};
    use crate::coord::Coord;
    use crate::gazetteer::world::{read_world_gazetteer_and_match, WorldGazetteerEntry};
    use crate::gazetteer::{Gazetteer, LocationRef};
    use crate::grid::RegionGrid;
    use crate::region::StatRegionTable;

    #[test]
    fn lines_are_parsed(){
        let entry = WorldGazetteerEntry::parse("12\tTucson\tTuscon, Old Pueblo\t\tlocality\t520116\t3222\t-11093\tUnited States\tArizona\tPima\n").unwrap();
        assert_eq!("Tucson", entry.name);
        assert_eq!(vec!["Tuscon".to_string(), "Old Pueblo".to_string()], entry.altnames);
        assert_eq!(Coord::new(32.22, -110.93), entry.coord);
        assert_eq!(["United States", "Arizona", "Pima"], entry.divs);

        let short = WorldGazetteerEntry::parse("13\tNowhere\t\t\tlocality\t\t100\t200").unwrap();
        assert_eq!(["", "", ""], short.divs);
        assert!(short.altnames.is_empty());

        assert!(WorldGazetteerEntry::parse("14\tLost\t\t\tlocality\t\t\t\tA\tB\tC").is_none());
        assert!(WorldGazetteerEntry::parse("15\tBad\t\t\tlocality\t\t0\t9999\tA\tB\tC").is_none());
        assert!(WorldGazetteerEntry::parse("16\tWorse\t\t\tlocality\t\tnorth\t12\tA\tB\tC").is_none());
    }

    #[test]
    fn gazetteer_file_is_matched(){
        let _ = env_logger::builder().is_test(true).try_init();
        let mut articles = ArticleTable::new();
        let grid = RegionGrid::new(1.0, 1).unwrap();
        let mut regions = StatRegionTable::new(grid, 1, true);
        for (title, lat, long) in [("Tucson, Arizona", 32.2217, -110.9264), ("Arizona", 33.0, -111.8), ("Flagstaff", 35.2, -111.65)] {
            let coord = Coord::new(lat, long);
            let id = articles.insert(Article {
                title: title.to_string(),
                coord: Some(coord),
                incoming_links: Some(10),
                split: Split::Training,
                ..Default::default()
            });
            articles.record_own_article(id);
            regions.add_article_to_region(id, &coord);
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1\tTucson\t\t\tlocality\t520116\t3222\t-11093\tUnited States\tArizona\tPima").unwrap();
        writeln!(file, "2\tFlagstaff\t\t\tlocality\t65870\t3519\t-11165\tUnited States\tArizona\tCoconino").unwrap();
        writeln!(file, "3\tYuma\t\t\tlocality\t93064\t3269\t-11463\tUnited States\tArizona\tYuma").unwrap();
        writeln!(file, "4\tNowhere\t\t\tlocality\t\t0\t9999\tUnited States\tArizona\t").unwrap();
        file.flush().unwrap();

        let mut gazetteer = Gazetteer::new();
        let seen = read_world_gazetteer_and_match(file.path(), &mut gazetteer, &mut articles, &regions, 80.0, None).unwrap();
        assert_eq!(4, seen);
        assert_eq!(3, gazetteer.num_localities());
        let flagstaff = gazetteer.locations_for_toponym("flagstaff")[0];
        assert!(gazetteer.locality(flagstaff).matched.is_some());
        let yuma = gazetteer.locations_for_toponym("yuma")[0];
        assert!(gazetteer.locality(yuma).matched.is_none());

        let arizona = gazetteer.division_for_path(&["United States", "Arizona"]).unwrap();
        let matched = gazetteer.division(arizona).matched.unwrap();
        assert_eq!("Arizona", articles.get(matched).title);
        assert_eq!(Some(LocationRef::Division(arizona)), articles.get(matched).location);
        assert_eq!(Some(matched), gazetteer.matched_article(LocationRef::Division(arizona)));
    }
}
