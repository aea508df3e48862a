use std::collections::HashSet;
use std::sync::LazyLock;
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use regex::Regex;
use crate::article::table::ArticleTable;
use crate::article::ArticleId;
use crate::config::EvalFormat;
use crate::context::GeoContext;
use crate::coord::Coord;
use crate::errors::{GeotagError, ReadError};
use crate::eval::results::GeotagToponymResults;
use crate::eval::IncorrectReason;
use crate::evaluator::TestFileEvaluator;
use crate::strategy::ToponymStrategy;

static ARTICLE_TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new("^Article title: (.*)$").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new("^Link: (.*)$").unwrap());

/// A word of an evaluation file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeogWord {
    pub word: String,
    /// Set for stopwords, a toponym with a true coordinate is never a stopword.
    pub is_stop: bool,
    pub is_toponym: bool,
    /// The true coordinate of a toponym, if known.
    pub coord: Option<Coord>,
    /// The true location of a toponym, if known.
    pub location: Option<String>,
    /// The words around a toponym with their distance to it.
    pub context: Vec<(usize, String)>,
    /// The document the word is in.
    pub document: Option<String>,
}

impl GeogWord {
    pub fn new(word: impl Into<String>) -> Self {
        Self { word: word.into(), ..Default::default() }
    }
}

fn read_lossy(path: &Utf8Path) -> Result<String, ReadError> {
    let bytes = std::fs::read(path).map_err(|source| ReadError::Open { path: path.as_std_path().to_path_buf(), source })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads a file in the TR-CoNLL format. Each word is on its own line followed
/// by a tab and its tags. A toponym is tagged with `LOC` and followed by lines
/// of candidates, each starting with a tab; the true one is marked with `>`:
///
/// ```text
/// Khartoum	LOC
/// 	>c1	NGA	15.5833333	32.5333333	Khartoum > Al Khartum > Sudan
/// 	c2	NGA	-17.8833333	30.1166667	Khartoum > Zimbabwe
/// ```
///
/// The file name is the document of every word.
pub fn read_tr_conll_words(path: &Utf8Path) -> Result<Vec<GeogWord>, ReadError> {
    let content = read_lossy(path)?;
    let document = path.to_string();
    let mut words = Vec::new();
    let mut pending: Option<GeogWord> = None;
    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        let Some((word, ty)) = line.split_once('\t') else {
            log::warn!("Bad line {line}");
            continue;
        };
        if !word.is_empty() {
            words.extend(pending.take());
            let mut geogword = GeogWord::new(word);
            geogword.document = Some(document.clone());
            if ty.starts_with("LOC") {
                geogword.is_toponym = true;
                pending = Some(geogword);
            } else {
                words.push(geogword);
            }
        } else if let Some(ref mut toponym) = pending {
            if !ty.starts_with('>') {
                continue;
            }
            match ty.splitn(5, '\t').collect_vec()[..] {
                [_, _, lat, long, fulltop] => match (lat.parse::<f64>(), long.parse::<f64>()) {
                    (Ok(lat), Ok(long)) => {
                        toponym.coord = Some(Coord::new(lat, long));
                        toponym.location = Some(fulltop.to_string());
                    }
                    (Err(err), _) | (_, Err(err)) => log::warn!("Bad line {line}: {err}"),
                },
                _ => log::warn!("Bad line {line}"),
            }
        }
    }
    words.extend(pending);
    Ok(words)
}

/// Reads the text of Wikipedia articles. A line `Article title: ...` starts a
/// document, a line `Link: article` or `Link: article|text` is a toponym
/// referring to the article and every other line is a plain word.
pub fn read_wikipedia_words(path: &Utf8Path, articles: &ArticleTable) -> Result<Vec<GeogWord>, ReadError> {
    let content = read_lossy(path)?;
    let mut title: Option<String> = None;
    let mut words = Vec::new();
    for line in content.lines() {
        if let Some(captures) = ARTICLE_TITLE.captures(line) {
            title = Some(captures[1].to_string());
        } else if let Some(captures) = LINK.captures(line) {
            let link = &captures[1];
            let mut args = link.split('|');
            let trueart = args.next().unwrap_or(link);
            let linkword = args.next().unwrap_or(trueart);
            let mut word = GeogWord::new(linkword);
            word.is_toponym = true;
            word.location = Some(trueart.to_string());
            word.document = title.clone();
            word.coord = articles.lookup_article(trueart).and_then(|id| articles.get(id).coord);
            words.push(word);
        } else {
            let mut word = GeogWord::new(line);
            word.document = title.clone();
            words.push(word);
        }
    }
    Ok(words)
}

/// Marks the stopwords and gives every toponym with a true coordinate up to
/// `context_len` words on either side, stopwords left out.
fn compute_context(words: &mut [GeogWord], stopwords: &HashSet<String>, context_len: usize) {
    for word in words.iter_mut() {
        word.is_stop = word.coord.is_none() && stopwords.contains(&word.word.to_lowercase());
    }
    for i in 0..words.len() {
        if words[i].coord.is_none() {
            continue;
        }
        let min = i.saturating_sub(context_len);
        let max = (i + context_len + 1).min(words.len());
        let context = (min..max)
            .filter(|&j| j != i && !words[j].is_stop)
            .map(|j| (i.abs_diff(j), words[j].word.clone()))
            .collect_vec();
        words[i].context = context;
    }
}

fn incorrect_reason(ctx: &GeoContext, candidates: &[ArticleId], coord: &Coord) -> IncorrectReason {
    if candidates.is_empty() {
        return IncorrectReason::IncorrectWithNoCandidates;
    }
    let good = candidates.iter().copied().filter(|&art| ctx.article_matches_coord(art, coord)).collect_vec();
    match good[..] {
        [] => IncorrectReason::IncorrectWithNoCorrectCandidates,
        [one] if ctx.articles.get(one).incoming_links.is_none() => IncorrectReason::IncorrectOneCorrectCandidateMissingLinkInfo,
        [_] => IncorrectReason::IncorrectOneCorrectCandidate,
        _ => IncorrectReason::IncorrectWithMultipleCorrectCandidates,
    }
}

/// Resolves every toponym with a known location in the evaluation files and
/// counts how often the best candidate is at the true location.
#[derive(Debug)]
pub struct GeotagToponymEvaluator {
    strategy: ToponymStrategy,
    strategy_name: String,
    format: EvalFormat,
    pub results: GeotagToponymResults,
}

impl GeotagToponymEvaluator {
    pub fn new(strategy: ToponymStrategy, strategy_name: impl Into<String>, format: EvalFormat) -> Self {
        Self {
            strategy,
            strategy_name: strategy_name.into(),
            format,
            results: GeotagToponymResults::default(),
        }
    }

    /// Scores every candidate of the toponym and records whether the best one
    /// is at its true location. Words without a true coordinate are ignored.
    pub fn disambiguate_toponym(&mut self, ctx: &GeoContext, word: &GeogWord) {
        let Some(coord) = word.coord else { return };
        let toponym = word.word.as_str();
        let candidates = ctx.construct_candidates(toponym);
        let mut best_score = -1e308;
        let mut best = None;
        if candidates.is_empty() {
            log::debug!("Unable to find any possibilities for {toponym}");
        } else {
            log::debug!("For toponym {toponym} at {coord}, {} possible articles", candidates.len());
            for &art in &candidates {
                let score = self.strategy.compute_score(ctx, &word.context, art);
                log::trace!("Article {} has score {score}", ctx.articles.get(art));
                if score > best_score {
                    best_score = score;
                    best = Some(art);
                }
            }
        }
        let correct = best.is_some_and(|art| ctx.article_matches_coord(art, &coord));
        let reason = (!correct).then(|| incorrect_reason(ctx, &candidates, &coord));

        let location = word.location.as_deref().unwrap_or_default();
        match reason {
            None => log::info!("Eval: Toponym {toponym} (true: {location} at {coord}), correct"),
            Some(reason) => log::info!("Eval: Toponym {toponym} (true: {location} at {coord}), incorrect, reason = {reason}"),
        }
        self.results.record_result(correct, toponym, location, reason, candidates.len());

        if let Some(art) = best {
            log::debug!(
                "Best article = {}, score = {best_score}, correct {correct}",
                ctx.articles.get(art)
            );
        }
    }
}

impl TestFileEvaluator for GeotagToponymEvaluator {
    type Source = Utf8PathBuf;
    type Document = Vec<GeogWord>;

    fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    /// The toponyms with a true coordinate, grouped by document.
    fn iter_documents(&mut self, ctx: &GeoContext, source: &Utf8PathBuf) -> Result<Vec<Vec<GeogWord>>, GeotagError> {
        let words = match self.format {
            EvalFormat::TrConll => read_tr_conll_words(source)?,
            EvalFormat::Wiki => read_wikipedia_words(source, &ctx.articles)?,
        };
        let mut documents = Vec::new();
        for (document, group) in &words.into_iter().chunk_by(|word| word.document.clone()) {
            if let Some(document) = document {
                log::info!("Processing document {document}...");
            }
            let mut words = group.collect_vec();
            for word in words.iter().filter(|word| word.is_toponym) {
                log::debug!("Saw loc {} with true coordinates {:?}, true location {:?}", word.word, word.coord, word.location);
            }
            if self.strategy.need_context() {
                compute_context(&mut words, &ctx.stopwords, ctx.config.naive_bayes_context_len);
            }
            words.retain(|word| word.coord.is_some());
            documents.push(words);
        }
        Ok(documents)
    }

    fn describe_document(&self, _ctx: &GeoContext, doc: &Vec<GeogWord>) -> String {
        doc.first().and_then(|word| word.document.clone()).unwrap_or_default()
    }

    fn evaluate_document(&mut self, ctx: &GeoContext, doc: &Vec<GeogWord>, _doctag: &str) -> Result<(), GeotagError> {
        for word in doc {
            self.disambiguate_toponym(ctx, word);
        }
        Ok(())
    }

    fn output_results(&self, _final_results: bool) {
        self.results.output_results();
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use camino::Utf8PathBuf;
    use tempfile::NamedTempFile;
    use crate::config::{BaselineStrategyName, EvalFormat, GeotagConfig, Mode};
    use crate::context::test::context;
    use crate::coord::Coord;
    use crate::eval::IncorrectReason;
    use crate::evaluator::toponym::{read_tr_conll_words, read_wikipedia_words, GeogWord, GeotagToponymEvaluator};
    use crate::evaluator::{evaluate_and_output_results, TestFileEvaluator};
    use crate::strategy::ToponymStrategy;

    const TR_CONLL: &str = "The\tO\tI-NP\tDT
Paris\tLOC
\t>c1\tNGA\t48.85\t2.35\tParis > Ile-de-France > France
\tc2\tNGA\t33.66\t-95.55\tParis > Texas > United States
is\tO\tI-VP\tVBZ
big\tO\tI-ADJP\tJJ

Paris\tLOC
\tc1\tNGA\t48.85\t2.35\tParis > Ile-de-France > France
\t>c2\tNGA\t33.66\t-95.55\tParis > Texas > United States
Tucson\tLOC
";

    const WIKI: &str = "Article title: Tourism
Visitors come to
Link: Paris
and to
Link: Tucson|the old pueblo
Link: Atlantis
Article title: Walls
Link: Berlin
";

    fn file(content: &str) -> (NamedTempFile, Utf8PathBuf) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).unwrap();
        (file, path)
    }

    fn toponym_config(format: EvalFormat) -> GeotagConfig {
        GeotagConfig { mode: Mode::GeotagToponyms, eval_format: format, ..Default::default() }
    }

    #[test]
    fn tr_conll_words_are_read(){
        let (_file, path) = file(TR_CONLL);
        let words = read_tr_conll_words(&path).unwrap();
        assert_eq!(6, words.len());
        assert_eq!("The", words[0].word);
        assert!(!words[0].is_toponym);
        assert!(words[1].is_toponym);
        assert_eq!(Some(Coord::new(48.85, 2.35)), words[1].coord);
        assert_eq!(Some("Paris > Ile-de-France > France"), words[1].location.as_deref());
        assert_eq!(Some(Coord::new(33.66, -95.55)), words[4].coord);
        assert!(words[5].is_toponym);
        assert_eq!(None, words[5].coord);
        assert_eq!(Some(path.to_string()), words[5].document);
    }

    #[test]
    fn context_leaves_out_stopwords(){
        let (_file, path) = file(TR_CONLL);
        let ctx = context(toponym_config(EvalFormat::TrConll));
        let mut evaluator = GeotagToponymEvaluator::new(ToponymStrategy::naive_bayes(true), "naive-bayes-with-baseline", EvalFormat::TrConll);
        let documents = evaluator.iter_documents(&ctx, &path).unwrap();
        assert_eq!(1, documents.len());
        let toponyms = &documents[0];
        assert_eq!(2, toponyms.len());
        let context = toponyms[0].context.iter().map(|(dist, word)| (*dist, word.as_str())).collect::<Vec<_>>();
        assert_eq!(vec![(1, "is"), (2, "big"), (3, "Paris"), (4, "Tucson")], context);
    }

    #[test]
    fn tr_conll_toponyms_are_resolved(){
        let _ = env_logger::builder().is_test(true).try_init();
        let (_file, path) = file(TR_CONLL);
        let ctx = context(toponym_config(EvalFormat::TrConll));
        let mut evaluator = GeotagToponymEvaluator::new(
            ToponymStrategy::baseline(BaselineStrategyName::InternalLink, Some(1)),
            "baseline internal-link",
            EvalFormat::TrConll,
        );
        evaluate_and_output_results(&mut evaluator, &ctx, [path]).unwrap();
        let all = &evaluator.results.all_toponym.eval;
        assert_eq!(2, all.total_instances);
        assert_eq!(1, all.correct_instances);
        assert_eq!(1, all.incorrect_for(IncorrectReason::IncorrectWithNoCorrectCandidates));
    }

    #[test]
    fn wikipedia_toponyms_are_resolved(){
        let _ = env_logger::builder().is_test(true).try_init();
        let (_file, path) = file(WIKI);
        let ctx = context(toponym_config(EvalFormat::Wiki));

        let words = read_wikipedia_words(&path, &ctx.articles).unwrap();
        assert_eq!(6, words.len());
        assert_eq!("the old pueblo", words[3].word);
        assert_eq!(Some("Tucson"), words[3].location.as_deref());
        assert!(words[3].coord.is_some());
        assert_eq!(None, words[4].coord);
        assert_eq!(Some("Walls"), words[5].document.as_deref());

        let mut evaluator = GeotagToponymEvaluator::new(
            ToponymStrategy::baseline(BaselineStrategyName::InternalLink, Some(1)),
            "baseline internal-link",
            EvalFormat::Wiki,
        );
        assert_eq!(2, evaluator.iter_documents(&ctx, &path).unwrap().len());
        evaluate_and_output_results(&mut evaluator, &ctx, [path]).unwrap();
        let results = &evaluator.results;
        assert_eq!(3, results.all_toponym.eval.total_instances);
        assert_eq!(2, results.all_toponym.eval.correct_instances);
        assert_eq!(1, results.all_toponym.eval.incorrect_for(IncorrectReason::IncorrectWithNoCandidates));
        assert_eq!(1, results.diff_surface.eval.total_instances);
    }

    #[test]
    fn unknown_context_keeps_the_right_candidate(){
        let _ = env_logger::builder().is_test(true).try_init();
        let ctx = context(toponym_config(EvalFormat::TrConll));
        let mut evaluator = GeotagToponymEvaluator::new(ToponymStrategy::naive_bayes(true), "naive-bayes-with-baseline", EvalFormat::TrConll);
        for context_word in ["eiffel", "zzzneverseen"] {
            let word = GeogWord {
                is_toponym: true,
                coord: Some(Coord::new(48.86, 2.35)),
                context: vec![(1, context_word.to_string())],
                ..GeogWord::new("Paris")
            };
            evaluator.disambiguate_toponym(&ctx, &word);
        }
        let all = &evaluator.results.all_toponym.eval;
        assert_eq!(2, all.total_instances);
        assert_eq!(2, all.correct_instances);
    }
}
