//! Topic clustering over cast text
//!
//! TF-IDF vectorization followed by k-means (k-means++ seeding). Small or
//! low-vocabulary corpora skip clustering and collapse into a single
//! catch-all cluster; that fallback is a first-class result, not an error.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use tracing::debug;

use crate::models::{Cast, CastMetrics, ThemeCluster};

pub const DEFAULT_CLUSTER_COUNT: usize = 7;
const MIN_VOCABULARY_SIZE: usize = 10;
const MAX_KMEANS_ITERATIONS: usize = 100;
const KEYWORDS_PER_CLUSTER: usize = 5;

/// Seed for k-means++ so repeated runs over the same corpus agree
const DEFAULT_KMEANS_SEED: u64 = 42;

/// Label of the catch-all cluster for corpora too small to cluster
pub const ALL_POSTS_LABEL: &str = "All Posts";
/// Label of the catch-all cluster for corpora too uniform to cluster
pub const MIXED_TOPICS_LABEL: &str = "Mixed Topics";

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for",
        "of", "with", "by", "from", "as", "is", "was", "are", "were", "been",
        "be", "have", "has", "had", "do", "does", "did", "will", "would", "could",
        "should", "may", "might", "must", "shall", "can", "need", "dare", "ought",
        "used", "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you",
        "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
        "she", "her", "hers", "herself", "it", "its", "itself", "they", "them",
        "their", "theirs", "themselves", "what", "which", "who", "whom", "this",
        "that", "these", "those", "am", "being", "having", "doing",
        "im", "ive", "id", "ill", "youre",
        "youve", "youd", "youll", "hes", "shes", "theyve", "theyd",
        "theyll", "wont", "dont", "didnt", "cant", "couldnt", "shouldnt", "wouldnt",
        "isnt", "arent", "wasnt", "werent", "hasnt", "havent", "hadnt", "doesnt",
        "just", "now", "also", "only", "then", "than", "so", "very", "too", "more",
        "most", "other", "some", "such", "no", "not", "same", "how", "all", "any",
        "both", "each", "few", "why",
        "here", "there", "when", "where", "again", "further", "once", "really",
        "like", "get", "got", "getting", "going", "go", "goes", "gone", "make",
        "makes", "made", "making", "take", "takes", "took", "taking", "come",
        "comes", "came", "coming", "know", "knows", "knew", "knowing", "think",
        "thinks", "thought", "thinking", "see", "sees", "saw", "seeing", "want",
        "wants", "wanted", "wanting", "use", "uses", "using", "find",
        "finds", "found", "finding", "give", "gives", "gave", "giving", "tell",
        "tells", "told", "telling", "let", "lets", "feel", "feels", "felt",
        "feeling", "try", "tries", "tried", "trying", "leave", "leaves", "left",
        "leaving", "call", "calls", "called", "calling", "keep", "keeps", "kept",
        "keeping", "seem", "seems", "seemed", "seeming", "help", "helps", "helped",
        "helping", "show", "shows", "showed", "showing", "hear", "hears", "heard",
        "hearing", "play", "plays", "played", "playing", "run", "runs", "ran",
        "running", "move", "moves", "moved", "moving", "live", "lives", "lived",
        "living", "work", "works", "worked", "working", "read", "reads", "reading",
        "last", "long", "great", "little", "own", "old", "right", "big", "high",
        "different", "small", "large", "next", "early", "young", "important",
        "public", "bad", "good", "new", "first", "day", "time", "year", "way",
        "thing", "man", "world", "life", "hand", "part", "child", "eye", "woman",
        "place", "case", "week", "company", "system", "program", "question",
        "government", "number", "night", "point", "home", "water", "room",
        "mother", "area", "money", "story", "fact", "month", "lot", "study",
        "book", "job", "word", "business", "issue", "side", "kind", "head",
        "house", "service", "friend", "father", "power", "hour", "game", "line",
        "end", "member", "law", "car", "city", "community", "name", "president",
        "team", "minute", "idea", "kid", "body", "information", "back", "parent",
        "face", "others", "level", "office", "door", "health", "person", "art",
        "war", "history", "party", "result", "change", "morning", "reason",
        "research",
    ]
    .into_iter()
    .collect()
});

/// Tokenize cast text: lowercase, strip URLs and non-letters, drop short
/// tokens and stop words.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|token| !token.starts_with("http://") && !token.starts_with("https://"))
        .flat_map(|token| {
            token
                .split(|c: char| !c.is_ascii_alphabetic())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|word| word.len() > 2 && !STOP_WORDS.contains(word.as_str()))
        .collect()
}

/// Build the vocabulary: tokens appearing in at least 2 documents but in no
/// more than 80% of them, each assigned a stable vector index.
fn build_vocabulary(casts: &[Cast]) -> (HashMap<String, usize>, HashMap<String, usize>) {
    let mut document_frequencies: HashMap<String, usize> = HashMap::new();

    for cast in casts {
        let unique_words: HashSet<String> = tokenize(&cast.text).into_iter().collect();
        for word in unique_words {
            *document_frequencies.entry(word).or_insert(0) += 1;
        }
    }

    let min_docs = 2;
    let max_docs = (casts.len() as f64 * 0.8).ceil() as usize;

    // Sort for stable index assignment across runs
    let mut surviving: Vec<(&String, &usize)> = document_frequencies
        .iter()
        .filter(|(_, &df)| df >= min_docs && df <= max_docs)
        .collect();
    surviving.sort_by(|a, b| a.0.cmp(b.0));

    let vocabulary: HashMap<String, usize> = surviving
        .iter()
        .enumerate()
        .map(|(idx, (word, _))| ((*word).clone(), idx))
        .collect();

    (vocabulary, document_frequencies)
}

/// Convert one text into an L2-normalized TF-IDF vector over the vocabulary
fn text_to_tfidf(
    text: &str,
    vocabulary: &HashMap<String, usize>,
    document_frequencies: &HashMap<String, usize>,
    total_docs: usize,
) -> Vec<f64> {
    let mut vector = vec![0.0; vocabulary.len()];

    let mut term_freqs: HashMap<String, usize> = HashMap::new();
    for word in tokenize(text) {
        if vocabulary.contains_key(&word) {
            *term_freqs.entry(word).or_insert(0) += 1;
        }
    }

    for (word, tf) in &term_freqs {
        if let Some(&idx) = vocabulary.get(word) {
            let df = document_frequencies.get(word).copied().unwrap_or(1).max(1);
            let idf = (total_docs as f64 / df as f64).ln();
            vector[idx] = *tf as f64 * idf;
        }
    }

    let magnitude = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if magnitude > 0.0 {
        for v in &mut vector {
            *v /= magnitude;
        }
    }

    vector
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// k-means++ initialization: first centroid uniform, the rest weighted by
/// squared distance to the nearest already-chosen centroid.
fn kmeans_plus_plus_init(vectors: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(vectors[rng.gen_range(0..vectors.len())].clone());

    while centroids.len() < k {
        let distances: Vec<f64> = vectors
            .iter()
            .map(|v| {
                centroids
                    .iter()
                    .map(|c| squared_distance(v, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();

        let total: f64 = distances.iter().sum();
        if total <= 0.0 {
            // All points coincide with existing centroids; fall back to uniform
            centroids.push(vectors[rng.gen_range(0..vectors.len())].clone());
            continue;
        }

        let mut target = rng.gen_range(0.0..total);
        let mut chosen = vectors.len() - 1;
        for (i, d) in distances.iter().enumerate() {
            if target < *d {
                chosen = i;
                break;
            }
            target -= d;
        }
        centroids.push(vectors[chosen].clone());
    }

    centroids
}

/// Lloyd's algorithm over the non-zero vectors. Returns the cluster index
/// of each input vector.
fn kmeans(vectors: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<usize> {
    let dims = vectors[0].len();
    let mut centroids = kmeans_plus_plus_init(vectors, k, rng);
    let mut assignments = vec![0usize; vectors.len()];

    for iteration in 0..MAX_KMEANS_ITERATIONS {
        let mut changed = false;

        for (i, vector) in vectors.iter().enumerate() {
            let nearest = centroids
                .iter()
                .enumerate()
                .map(|(j, c)| (j, squared_distance(vector, c)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map_or(0, |(j, _)| j);

            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }

        if !changed && iteration > 0 {
            debug!("k-means converged after {} iterations", iteration);
            break;
        }

        // Recompute centroids; empty clusters keep their previous position
        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        for (vector, &cluster) in vectors.iter().zip(assignments.iter()) {
            counts[cluster] += 1;
            for (s, v) in sums[cluster].iter_mut().zip(vector.iter()) {
                *s += v;
            }
        }
        for (cluster, count) in counts.iter().enumerate() {
            if *count > 0 {
                for (c, s) in centroids[cluster].iter_mut().zip(sums[cluster].iter()) {
                    *c = s / *count as f64;
                }
            }
        }
    }

    assignments
}

/// Top keywords for a cluster: average the member vectors into a centroid
/// and map the highest-weight dimensions back to vocabulary tokens.
fn extract_cluster_keywords(
    cluster_vectors: &[&Vec<f64>],
    vocabulary: &HashMap<String, usize>,
    top_k: usize,
) -> Vec<String> {
    if cluster_vectors.is_empty() {
        return Vec::new();
    }

    let dims = cluster_vectors[0].len();
    let mut centroid = vec![0.0; dims];
    for vector in cluster_vectors {
        for (c, v) in centroid.iter_mut().zip(vector.iter()) {
            *c += v;
        }
    }
    for c in &mut centroid {
        *c /= cluster_vectors.len() as f64;
    }

    let mut indexed: Vec<(usize, f64)> = centroid.into_iter().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let reverse_vocab: HashMap<usize, &String> =
        vocabulary.iter().map(|(word, &idx)| (idx, word)).collect();

    indexed
        .into_iter()
        .take(top_k)
        .filter(|(_, weight)| *weight > 0.0)
        .filter_map(|(idx, _)| reverse_vocab.get(&idx).map(|w| (*w).clone()))
        .collect()
}

fn truncated(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn avg_engagement(casts: &[&Cast], metrics_map: &HashMap<String, CastMetrics>) -> f64 {
    if casts.is_empty() {
        return 0.0;
    }
    casts
        .iter()
        .map(|c| metrics_map.get(&c.hash).map_or(0.0, |m| m.engagement_score))
        .sum::<f64>()
        / casts.len() as f64
}

/// Single catch-all cluster used when the corpus is too small or too
/// uniform to cluster meaningfully.
fn fallback_cluster(
    casts: &[Cast],
    metrics_map: &HashMap<String, CastMetrics>,
    label: &str,
    description: &str,
) -> (Vec<ThemeCluster>, HashMap<String, usize>) {
    let refs: Vec<&Cast> = casts.iter().collect();
    let cluster = ThemeCluster {
        id: 0,
        label: label.to_string(),
        description: description.to_string(),
        cast_hashes: casts.iter().map(|c| c.hash.clone()).collect(),
        avg_engagement: avg_engagement(&refs, metrics_map),
        sample_texts: casts
            .iter()
            .take(3)
            .map(|c| truncated(&c.text, 100))
            .collect(),
    };
    let assignments = casts.iter().map(|c| (c.hash.clone(), 0)).collect();
    (vec![cluster], assignments)
}

/// Cluster casts by topic using TF-IDF + k-means.
///
/// Returns the clusters sorted by average engagement descending, plus the
/// cast-hash to cluster-id assignment. Every cast is assigned to exactly
/// one cluster; zero-vector casts land in cluster 0.
pub fn cluster_casts(
    casts: &[Cast],
    metrics_map: &HashMap<String, CastMetrics>,
    num_clusters: usize,
) -> (Vec<ThemeCluster>, HashMap<String, usize>) {
    cluster_casts_seeded(casts, metrics_map, num_clusters, DEFAULT_KMEANS_SEED)
}

/// `cluster_casts` with an explicit k-means seed
pub fn cluster_casts_seeded(
    casts: &[Cast],
    metrics_map: &HashMap<String, CastMetrics>,
    num_clusters: usize,
    seed: u64,
) -> (Vec<ThemeCluster>, HashMap<String, usize>) {
    if casts.is_empty() || casts.len() < num_clusters {
        // Not enough casts to cluster meaningfully
        return fallback_cluster(casts, metrics_map, ALL_POSTS_LABEL, "All your recent casts");
    }

    let (vocabulary, document_frequencies) = build_vocabulary(casts);

    if vocabulary.len() < MIN_VOCABULARY_SIZE {
        return fallback_cluster(
            casts,
            metrics_map,
            MIXED_TOPICS_LABEL,
            "Your posts cover various topics",
        );
    }

    let vectors: Vec<Vec<f64>> = casts
        .iter()
        .map(|c| text_to_tfidf(&c.text, &vocabulary, &document_frequencies, casts.len()))
        .collect();

    // Casts with no vocabulary overlap get no say in clustering
    let non_zero_indices: Vec<usize> = vectors
        .iter()
        .enumerate()
        .filter(|(_, v)| v.iter().any(|&x| x > 0.0))
        .map(|(i, _)| i)
        .collect();

    if non_zero_indices.len() < num_clusters {
        return fallback_cluster(
            casts,
            metrics_map,
            MIXED_TOPICS_LABEL,
            "Your posts cover various topics",
        );
    }

    let non_zero_vectors: Vec<Vec<f64>> = non_zero_indices
        .iter()
        .map(|&i| vectors[i].clone())
        .collect();

    // Halving guards against degenerate empty clusters on small corpora
    let k = num_clusters.min(non_zero_vectors.len() / 2).max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let kmeans_assignments = kmeans(&non_zero_vectors, k, &mut rng);

    debug!(
        "Clustered {} casts into {} topics ({} zero-vector)",
        casts.len(),
        k,
        casts.len() - non_zero_indices.len()
    );

    // cast hash -> cluster id, with zero-vector casts in cluster 0
    let mut assignments: HashMap<String, usize> = HashMap::new();
    let mut cluster_members: HashMap<usize, Vec<&Cast>> = HashMap::new();
    let mut cluster_vectors: HashMap<usize, Vec<&Vec<f64>>> = HashMap::new();

    let non_zero_set: HashSet<usize> = non_zero_indices.iter().copied().collect();

    for (pos, &cast_idx) in non_zero_indices.iter().enumerate() {
        let cluster_id = kmeans_assignments[pos];
        let cast = &casts[cast_idx];
        assignments.insert(cast.hash.clone(), cluster_id);
        cluster_members.entry(cluster_id).or_default().push(cast);
        cluster_vectors
            .entry(cluster_id)
            .or_default()
            .push(&non_zero_vectors[pos]);
    }

    for (i, cast) in casts.iter().enumerate() {
        if !non_zero_set.contains(&i) {
            assignments.insert(cast.hash.clone(), 0);
            cluster_members.entry(0).or_default().push(cast);
        }
    }

    let mut clusters: Vec<ThemeCluster> = cluster_members
        .iter()
        .map(|(&cluster_id, members)| {
            let keywords = extract_cluster_keywords(
                cluster_vectors.get(&cluster_id).map_or(&[][..], Vec::as_slice),
                &vocabulary,
                KEYWORDS_PER_CLUSTER,
            );

            let label = if keywords.is_empty() {
                format!("Topic {}", cluster_id + 1)
            } else {
                keywords.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
            };

            ThemeCluster {
                id: cluster_id,
                label,
                // Filled in by the narrative generator
                description: String::new(),
                cast_hashes: members.iter().map(|c| c.hash.clone()).collect(),
                avg_engagement: avg_engagement(members, metrics_map),
                sample_texts: members
                    .iter()
                    .take(5)
                    .map(|c| truncated(&c.text, 150))
                    .collect(),
            }
        })
        .collect();

    clusters.sort_by(|a, b| {
        b.avg_engagement
            .partial_cmp(&a.avg_engagement)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    (clusters, assignments)
}

/// The cluster with the highest average engagement, if any
pub fn top_theme(clusters: &[ThemeCluster]) -> Option<&ThemeCluster> {
    clusters.iter().max_by(|a, b| {
        a.avg_engagement
            .partial_cmp(&b.avg_engagement)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn cast(hash: &str, text: &str) -> Cast {
        Cast {
            hash: hash.to_string(),
            fid: 1,
            text: text.to_string(),
            timestamp: Utc::now(),
            parent_hash: None,
            parent_fid: None,
            embeds: Vec::new(),
            mentions: Vec::new(),
        }
    }

    #[test]
    fn test_tokenize_strips_urls_and_stop_words() {
        let tokens = tokenize("Check https://example.com/x.png the onchain economy!");
        assert!(tokens.contains(&"onchain".to_string()));
        assert!(tokens.contains(&"economy".to_string()));
        assert!(!tokens.iter().any(|t| t.contains("example")));
        assert!(!tokens.contains(&"the".to_string()));
    }

    #[test]
    fn test_tokenize_drops_short_tokens() {
        let tokens = tokenize("go ai ml defi");
        assert_eq!(tokens, vec!["defi".to_string()]);
    }

    #[test]
    fn test_vocabulary_requires_two_documents() {
        let casts = vec![
            cast("0x1", "solana validators validators"),
            cast("0x2", "solana conference"),
            cast("0x3", "conference recap published"),
        ];
        let (vocab, _) = build_vocabulary(&casts);
        // "solana" and "conference" appear in 2 docs each; the rest in 1
        assert!(vocab.contains_key("solana"));
        assert!(vocab.contains_key("conference"));
        assert!(!vocab.contains_key("validators"));
        assert!(!vocab.contains_key("recap"));
    }

    #[test]
    fn test_tfidf_vectors_are_normalized() {
        let casts = vec![
            cast("0x1", "ethereum rollups scaling ethereum"),
            cast("0x2", "ethereum rollups fees"),
            cast("0x3", "painting watercolor scaling"),
            cast("0x4", "painting watercolor brushes"),
        ];
        let (vocab, dfs) = build_vocabulary(&casts);
        let v = text_to_tfidf(&casts[0].text, &vocab, &dfs, casts.len());
        let magnitude: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_kmeans_separates_distinct_topics() {
        let vectors = vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.95, 0.05],
            vec![0.0, 1.0],
            vec![0.1, 0.9],
            vec![0.05, 0.95],
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let assignments = kmeans(&vectors, 2, &mut rng);
        assert_eq!(assignments[0], assignments[1]);
        assert_eq!(assignments[1], assignments[2]);
        assert_eq!(assignments[3], assignments[4]);
        assert_eq!(assignments[4], assignments[5]);
        assert_ne!(assignments[0], assignments[3]);
    }

    #[test]
    fn test_fallback_small_corpus_is_all_posts() {
        let casts = vec![
            cast("0x1", "first post"),
            cast("0x2", "second post"),
            cast("0x3", "third post"),
        ];
        let metrics = HashMap::new();
        let (clusters, assignments) = cluster_casts(&casts, &metrics, 5);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].label, "All Posts");
        assert_eq!(clusters[0].cast_hashes.len(), 3);
        assert!(assignments.values().all(|&c| c == 0));
    }

    #[test]
    fn test_fallback_thin_vocabulary_is_mixed_topics() {
        // 10 casts but almost no shared vocabulary after filtering
        let casts: Vec<Cast> = (0..10)
            .map(|i| cast(&format!("0x{i}"), &format!("uniqueword{i}")))
            .collect();
        let metrics = HashMap::new();
        let (clusters, _) = cluster_casts(&casts, &metrics, 5);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].label, "Mixed Topics");
        assert_eq!(clusters[0].cast_hashes.len(), 10);
    }

    #[test]
    fn test_fallback_sample_texts_truncated() {
        let long_text = "x".repeat(300);
        let casts = vec![cast("0x1", &long_text)];
        let metrics = HashMap::new();
        let (clusters, _) = cluster_casts(&casts, &metrics, 5);
        assert_eq!(clusters[0].sample_texts[0].chars().count(), 100);
    }

    #[test]
    fn test_top_theme_none_when_empty() {
        assert!(top_theme(&[]).is_none());
    }

    #[test]
    fn test_top_theme_picks_highest_engagement() {
        let clusters = vec![
            ThemeCluster {
                id: 0,
                label: "a".into(),
                description: String::new(),
                cast_hashes: vec![],
                avg_engagement: 2.0,
                sample_texts: vec![],
            },
            ThemeCluster {
                id: 1,
                label: "b".into(),
                description: String::new(),
                cast_hashes: vec![],
                avg_engagement: 9.0,
                sample_texts: vec![],
            },
        ];
        assert_eq!(top_theme(&clusters).map(|c| c.id), Some(1));
    }
}
