use std::collections::{BTreeMap, HashMap};
use itertools::Itertools;
use geogrounder_toolkit::text::capfirst;
use geogrounder_worddist::{CorpusStatistics, WordDistError};
use crate::article::{adjusted_incoming_links, compute_short_form, Article, ArticleId, Split, StatArticle};
use crate::boundary::Boundary;
use crate::coord::{spheredist_opt, Coord};

/// Decides whether an article is a match for a gazetteer location and which of two matches is better.
#[derive(Debug, Copy, Clone)]
pub enum MatchCriterion<'a> {
    /// The article lies at most `max_dist` miles away from `coord`, closer is better.
    Near { coord: Coord, max_dist: f64 },
    /// The article lies inside of the boundary, more incoming links are better.
    Inside(&'a Boundary),
}

impl MatchCriterion<'_> {
    pub fn check(&self, art: &StatArticle) -> bool {
        match self {
            MatchCriterion::Near { coord, max_dist } => {
                let dist = spheredist_opt(Some(coord), art.coord.as_ref());
                if dist <= *max_dist {
                    true
                } else {
                    log::trace!("Found article {art} but dist {dist} > {max_dist}");
                    false
                }
            }
            MatchCriterion::Inside(boundary) => {
                match art.coord {
                    Some(ref coord) if boundary.contains(coord) => true,
                    _ => {
                        log::trace!("Found article {art} but not in {boundary}");
                        false
                    }
                }
            }
        }
    }

    /// True if `a` is strictly better than `b`.
    pub fn prefers(&self, a: &StatArticle, b: &StatArticle) -> bool {
        match self {
            MatchCriterion::Near { coord, .. } => {
                spheredist_opt(Some(coord), a.coord.as_ref()) < spheredist_opt(Some(coord), b.coord.as_ref())
            }
            MatchCriterion::Inside(_) => {
                match (a.incoming_links, b.incoming_links) {
                    (Some(la), Some(lb)) => la > lb,
                    // without link counts the later match wins
                    _ => true
                }
            }
        }
    }
}

/// All articles and the lookup tables over their names.
#[derive(Debug, Default)]
pub struct ArticleTable {
    articles: Vec<StatArticle>,
    name_to_article: HashMap<String, ArticleId>,
    lower_name_to_articles: HashMap<String, Vec<ArticleId>>,
    short_lower_name_to_articles: HashMap<String, Vec<ArticleId>>,
    lower_name_div_to_articles: HashMap<(String, String), Vec<ArticleId>>,
    lower_toponym_to_article: HashMap<String, Vec<ArticleId>>,
    articles_by_split: BTreeMap<Split, Vec<ArticleId>>,

    pub num_articles_with_word_counts: usize,
    pub num_articles_with_word_counts_but_not_in_table: usize,
    pub num_word_count_articles_by_split: BTreeMap<Split, usize>,
    pub num_dist_articles_by_split: BTreeMap<Split, usize>,
    pub word_tokens_by_split: BTreeMap<Split, u64>,
    pub incoming_links_by_split: BTreeMap<Split, f64>,
}

impl ArticleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the article without registering any of its names.
    pub fn insert(&mut self, article: Article) -> ArticleId {
        let id = ArticleId(self.articles.len());
        self.articles.push(StatArticle::new(article));
        id
    }

    pub fn get(&self, id: ArticleId) -> &StatArticle {
        &self.articles[id.0]
    }

    pub fn get_mut(&mut self, id: ArticleId) -> &mut StatArticle {
        &mut self.articles[id.0]
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArticleId, &StatArticle)> {
        self.articles.iter().enumerate().map(|(idx, art)| (ArticleId(idx), art))
    }

    pub fn articles_in_split(&self, split: Split) -> &[ArticleId] {
        self.articles_by_split.get(&split).map_or(&[], Vec::as_slice)
    }

    /// Looks up an article by its title. Titles are case sensitive except for the first letter.
    pub fn lookup_article(&self, name: &str) -> Option<ArticleId> {
        self.name_to_article.get(&capfirst(name)).copied()
    }

    /// Articles known under the lower cased toponym, either by full or by short name.
    pub fn articles_for_toponym(&self, lower_toponym: &str) -> &[ArticleId] {
        self.lower_toponym_to_article.get(lower_toponym).map_or(&[], Vec::as_slice)
    }

    /// Records `name` as one of the names of the article. An article can have
    /// multiple names because of redirects.
    pub fn record_article_name(&mut self, name: &str, art: ArticleId) {
        let name = capfirst(name);
        let loname = name.to_lowercase();
        self.name_to_article.insert(name, art);
        self.lower_name_to_articles.entry(loname.clone()).or_default().push(art);
        let (short, div) = compute_short_form(&loname);
        if let Some(div) = div {
            self.lower_name_div_to_articles.entry((short.clone(), div)).or_default().push(art);
        }
        self.short_lower_name_to_articles.entry(short.clone()).or_default().push(art);
        let toponyms = self.lower_toponym_to_article.entry(loname.clone()).or_default();
        if !toponyms.contains(&art) {
            toponyms.push(art);
        }
        if short != loname {
            let toponyms = self.lower_toponym_to_article.entry(short).or_default();
            if !toponyms.contains(&art) {
                toponyms.push(art);
            }
        }
    }

    /// Records a stored article under its own title.
    pub fn record_own_article(&mut self, id: ArticleId) {
        let art = self.get(id);
        let title = art.title.clone();
        let links = art.incoming_links;
        self.record(&title, links, false, id);
    }

    /// Records `from` as a redirect to the stored article `to`.
    pub fn record_redirect(&mut self, from: &Article, to: ArticleId) {
        self.record(&from.title, from.incoming_links, true, to);
    }

    fn record(&mut self, title: &str, links: Option<u64>, is_redirect: bool, to: ArticleId) {
        self.record_article_name(title, to);
        let split = self.get(to).split;
        *self.incoming_links_by_split.entry(split).or_default() += adjusted_incoming_links(links);
        if !is_redirect {
            self.articles_by_split.entry(split).or_default().push(to);
        } else if let Some(links) = links {
            // links to a redirect count as links to its target
            let target = self.get_mut(to);
            target.incoming_links = Some(target.incoming_links.unwrap_or(0) + links);
        }
    }

    /// Finishes every article distribution and fills the per split counters.
    pub fn finish_article_distributions(&mut self, stats: &CorpusStatistics, minimum_word_count: u64) -> Result<(), WordDistError> {
        for (split, ids) in self.articles_by_split.iter() {
            let mut total_tokens = 0;
            let mut num_articles = 0;
            for id in ids {
                if let Some(ref mut dist) = self.articles[id.0].dist {
                    dist.finish(stats, minimum_word_count)?;
                    total_tokens += dist.total_tokens();
                    num_articles += 1;
                }
            }
            self.num_dist_articles_by_split.insert(*split, num_articles);
            self.word_tokens_by_split.insert(*split, total_tokens);
        }
        Ok(())
    }

    /// Drops the distributions of the training articles once the regions hold them.
    pub fn clear_training_article_distributions(&mut self) {
        if let Some(ids) = self.articles_by_split.get(&Split::Training) {
            for id in ids {
                self.articles[id.0].dist = None;
            }
        }
    }

    /// Looks for an article called `name` that satisfies the criterion: first by
    /// full name, then as `name, division` for the divisions in `div_path`, last
    /// by short name.
    pub fn find_one_match(&self, name: &str, div_path: &[String], criterion: &MatchCriterion) -> Option<ArticleId> {
        let loname = name.to_lowercase();
        if let Some(ids) = self.lower_name_to_articles.get(&loname) {
            if let Some(found) = ids.iter().find(|id| criterion.check(self.get(**id))) {
                return Some(*found);
            }
        }
        for div in div_path {
            if let Some(ids) = self.lower_name_div_to_articles.get(&(loname.clone(), div.to_lowercase())) {
                if let Some(found) = ids.iter().find(|id| criterion.check(self.get(**id))) {
                    return Some(*found);
                }
            }
        }
        let good = self.short_lower_name_to_articles
            .get(&loname)
            .map(|ids| ids.iter().copied().filter(|id| criterion.check(self.get(*id))).collect_vec())
            .unwrap_or_default();
        if good.len() > 1 {
            log::trace!("Saw {} toponym matches for {name}", good.len());
        }
        good.into_iter().reduce(|best, next| {
            if criterion.prefers(self.get(next), self.get(best)) { next } else { best }
        })
    }

    /// Tries every name in turn and returns the first match.
    pub fn find_wikipedia_match<'a>(&self, names: impl IntoIterator<Item = &'a str>, div_path: &[String], criterion: &MatchCriterion) -> Option<ArticleId> {
        names.into_iter().find_map(|name| self.find_one_match(name, div_path, criterion))
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::article::table::{ArticleTable, MatchCriterion};
    use crate::article::{Article, Split};
    use crate::boundary::Boundary;
    use crate::coord::Coord;

    fn article(title: &str, id: i64, coord: Option<Coord>, links: Option<u64>) -> Article {
        Article {
            title: title.to_string(),
            id,
            coord,
            incoming_links: links,
            split: Split::Training,
            namespace: "Main".to_string(),
            ..Default::default()
        }
    }

    fn table() -> ArticleTable {
        let mut table = ArticleTable::new();
        for art in [
            article("Springfield, Illinois", 1, Some(Coord::new(39.8, -89.65)), Some(500)),
            article("Springfield, Massachusetts", 2, Some(Coord::new(42.1, -72.59)), Some(300)),
            article("Paris", 3, Some(Coord::new(48.86, 2.35)), Some(1000)),
            article("Paris (band)", 4, None, Some(3)),
        ] {
            let id = table.insert(art);
            table.record_own_article(id);
        }
        table
    }

    #[test]
    fn names_are_registered(){
        let table = table();
        assert_eq!(Some(0), table.lookup_article("springfield, Illinois").map(|id| id.index()));
        assert_eq!(None, table.lookup_article("Springfield"));
        assert_eq!(2, table.articles_for_toponym("springfield").len());
        assert_eq!(2, table.articles_for_toponym("paris").len());
        assert_eq!(4, table.articles_in_split(Split::Training).len());
        assert_relative_eq!(1803.0, table.incoming_links_by_split[&Split::Training]);
    }

    #[test]
    fn redirects_add_links(){
        let mut table = table();
        let paris = table.lookup_article("Paris").unwrap();
        let redirect = Article {
            redir: "Paris".to_string(),
            ..article("Paname", 9, None, Some(20))
        };
        table.record_redirect(&redirect, paris);
        assert_eq!(Some(1020), table.get(paris).incoming_links);
        assert_eq!(Some(paris), table.lookup_article("Paname"));
        assert_eq!(4, table.articles_in_split(Split::Training).len());
    }

    #[test]
    fn matching_by_distance(){
        let table = table();
        let near = MatchCriterion::Near { coord: Coord::new(39.78, -89.6), max_dist: 80.0 };
        let found = table.find_one_match("Springfield", &[], &near).unwrap();
        assert_eq!("Springfield, Illinois", table.get(found).title);

        let path = vec!["Massachusetts".to_string()];
        let near_ma = MatchCriterion::Near { coord: Coord::new(42.0, -72.6), max_dist: 80.0 };
        let found = table.find_one_match("springfield", &path, &near_ma).unwrap();
        assert_eq!("Springfield, Massachusetts", table.get(found).title);

        let far = MatchCriterion::Near { coord: Coord::new(0.0, 0.0), max_dist: 80.0 };
        assert_eq!(None, table.find_wikipedia_match(["Springfield", "Paris"], &[], &far));
    }

    #[test]
    fn matching_by_boundary_prefers_links(){
        let table = table();
        let usa = Boundary::new(Coord::new(25.0, -125.0), Coord::new(49.0, -66.0));
        let found = table.find_one_match("Springfield", &[], &MatchCriterion::Inside(&usa)).unwrap();
        assert_eq!("Springfield, Illinois", table.get(found).title);
    }

    #[test]
    fn matching_by_boundary_without_links_takes_the_later(){
        let mut table = table();
        let id = table.insert(article("Springfield, Ohio", 5, Some(Coord::new(39.92, -83.81)), None));
        table.record_own_article(id);
        let usa = Boundary::new(Coord::new(25.0, -125.0), Coord::new(49.0, -66.0));
        let found = table.find_one_match("Springfield", &[], &MatchCriterion::Inside(&usa)).unwrap();
        assert_eq!("Springfield, Ohio", table.get(found).title);
    }

    #[test]
    fn redirects_without_links_leave_the_target(){
        let mut table = table();
        let paris = table.lookup_article("Paris").unwrap();
        let redirect = Article {
            redir: "Paris".to_string(),
            ..article("Lutetia", 10, None, None)
        };
        table.record_redirect(&redirect, paris);
        assert_eq!(Some(1000), table.get(paris).incoming_links);
        assert_relative_eq!(1803.01, table.incoming_links_by_split[&Split::Training]);
    }
}
