// Morphological segmentation into noun and noun-phrase units from raw text.
//
// The Morphology trait is the seam for a full analyzer. The built-in
// ParticleSegmenter is rule-based: Korean is agglutinative, so most nouns in
// running text carry a trailing postposition (은/는/이/가/을/를/...). Stripping
// the longest matching particle recovers the noun; tokens that end in a verbal
// or adjectival ending are predicates and are skipped.
//
// Without a dictionary both rules over-fire on nouns whose last syllable looks
// like a particle or ending (결과, 회의, 바다). Three checks hold them back:
// the particle must agree with the stem's final consonant, a one-syllable stem
// is only split off the object and topic markers, and KNOWN_NOUNS are never cut.

/// Noun and phrase segmentation.
pub trait Morphology: Send + Sync {
    /// Noun units in text order (duplicates kept, so callers can count).
    fn nouns(&self, text: &str) -> Vec<String>;

    /// Noun-phrase candidates, deduplicated in first-seen order.
    fn phrases(&self, text: &str) -> Vec<String>;
}

/// Trailing postpositions, longest first so the greedy match strips the
/// whole particle ("에서는" before "는").
const PARTICLES: &[&str] = &[
    "으로부터", "에서부터", "에게서", "으로서", "으로써", "이라고", "에서는", "에서도",
    "까지는", "부터는", "에서", "에게", "한테", "으로", "로서", "로써", "까지", "부터",
    "처럼", "보다", "이나", "이며", "이랑", "에는", "에도", "와는", "과는", "라고", "들은",
    "들이", "들을", "들의", "들도", "은", "는", "이", "가", "을", "를", "에", "의", "도",
    "만", "로", "와", "과", "나", "랑",
];

/// Particles that join two nouns into one phrase ("삼성전자의 회장", "AI와 반도체").
const CONNECTIVES: &[&str] = &["의", "와", "과"];

/// Particle forms that only follow a stem ending in a consonant.
const AFTER_CONSONANT: &[&str] = &[
    "으로부터", "으로서", "으로써", "이라고", "으로", "이나", "이며", "이랑", "은", "을",
    "이", "과",
];

/// Particle forms that only follow a stem ending in a vowel. The 로 forms also
/// follow a final ㄹ.
const AFTER_VOWEL: &[&str] = &[
    "로서", "로써", "라고", "는", "를", "가", "와", "로", "나", "랑",
];

/// Particles that may be split off a one-syllable stem (책을, 물은). Any other
/// particle after one syllable is more likely the end of a two-syllable noun.
const SHORT_STEM_PARTICLES: &[&str] = &["은", "는", "을", "를"];

/// Common nouns whose tail collides with a particle or a predicate ending.
/// A token ending in one of these is a noun and is never cut.
const KNOWN_NOUNS: &[&str] = &[
    // 과 / 와
    "결과", "효과", "성과", "학과", "교과", "사과", "통과",
    // 의
    "회의", "주의", "정의", "의의", "동의", "합의", "논의", "강의", "토의", "건의",
    // 이
    "차이", "나이", "길이", "높이", "깊이", "넓이", "아이", "종이", "놀이",
    // 도
    "속도", "정도", "제도", "태도", "온도", "의도", "지도", "각도", "밀도", "농도", "습도",
    "빈도", "한도", "용도", "시도", "강도", "식도",
    // 가
    "국가", "평가", "대가", "물가", "주가", "휴가", "증가", "추가", "참가",
    // 로 / 나 / 만
    "도로", "경로", "진로", "통로", "하나", "코로나", "불만",
    // 은 / 을
    "가을", "마을",
    // 고
    "보고", "광고", "최고", "창고", "경고", "사고", "재고", "참고", "원고", "냉장고",
    // 다 / 요
    "바다", "필요", "수요", "중요",
    // 서 / 면 / 게
    "순서", "문서", "질서", "보고서", "계산서", "설명서", "교과서", "측면", "장면", "화면",
    "표면", "국면", "가게", "무게",
];

/// Endings that mark a Hangul token as a predicate rather than a noun.
const PREDICATE_ENDINGS: &[&str] = &[
    "습니다", "합니다", "됩니다", "입니다", "했다", "한다", "된다", "이다", "하고", "하며",
    "하는", "했던", "되는", "되어", "해서", "하게", "지만", "는데", "면서", "으며", "었다",
    "았다", "겠다", "니다", "어요", "아요", "해요", "세요", "다", "고", "며", "면", "서",
    "게", "던", "요", "죠",
];

/// One whitespace token after classification.
#[derive(Debug, Clone, PartialEq)]
enum Unit {
    /// A noun; `joined` is true when it attaches to the next noun in a phrase.
    Noun { stem: String, joined: bool },
    /// A predicate or anything else that ends a phrase run.
    Break,
}

/// Rule-based segmenter for Korean (and mixed Korean/Latin) text.
#[derive(Debug, Clone, Default)]
pub struct ParticleSegmenter;

impl ParticleSegmenter {
    pub fn new() -> Self {
        Self
    }

    fn units(&self, text: &str) -> Vec<Unit> {
        let mut units = Vec::new();
        for raw in text.split_whitespace() {
            let ends_sentence = raw.ends_with(['.', '!', '?', ';', ':']);
            let token = raw.trim_matches(|c: char| !c.is_alphanumeric());
            if token.is_empty() {
                units.push(Unit::Break);
                continue;
            }
            units.push(classify(token));
            if ends_sentence || raw.ends_with(',') {
                units.push(Unit::Break);
            }
        }
        units
    }
}

impl Morphology for ParticleSegmenter {
    fn nouns(&self, text: &str) -> Vec<String> {
        self.units(text)
            .into_iter()
            .filter_map(|unit| match unit {
                Unit::Noun { stem, .. } => Some(stem),
                Unit::Break => None,
            })
            .collect()
    }

    fn phrases(&self, text: &str) -> Vec<String> {
        let mut phrases: Vec<String> = Vec::new();
        let mut run: Vec<String> = Vec::new();

        for unit in self.units(text) {
            match unit {
                Unit::Noun { stem, joined } => {
                    run.push(stem);
                    if !joined {
                        flush_run(&mut run, &mut phrases);
                    }
                }
                Unit::Break => flush_run(&mut run, &mut phrases),
            }
        }
        flush_run(&mut run, &mut phrases);

        phrases
    }
}

/// Emit every prefix of two or more nouns, then the multi-syllable nouns.
fn flush_run(run: &mut Vec<String>, phrases: &mut Vec<String>) {
    for end in 2..=run.len() {
        push_unique(phrases, run[..end].join(" "));
    }
    for noun in run.iter() {
        if noun.chars().count() > 1 {
            push_unique(phrases, noun.clone());
        }
    }
    run.clear();
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

fn is_hangul(c: char) -> bool {
    ('가'..='힣').contains(&c)
}

/// First particle in PARTICLES order whose removal leaves an accepted stem.
fn split_particle(
    token: &str,
    accept: impl Fn(&str, &str) -> bool,
) -> Option<(&str, &'static str)> {
    PARTICLES.iter().find_map(|&particle| {
        token
            .strip_suffix(particle)
            .filter(|stem| accept(*stem, particle))
            .map(|stem| (stem, particle))
    })
}

fn is_known_noun(word: &str) -> bool {
    KNOWN_NOUNS.iter().any(|noun| word.ends_with(noun))
}

/// Final consonant (jongseong) index of a precomposed Hangul syllable; 0 = none.
fn final_consonant(c: char) -> Option<u32> {
    is_hangul(c).then(|| (c as u32 - '가' as u32) % 28)
}

const FINAL_RIEUL: u32 = 8;

/// Whether `particle` can really be a suffix split off `stem`.
fn valid_stem(stem: &str, particle: &str) -> bool {
    let Some(last) = stem.chars().last() else {
        return false;
    };
    if stem.chars().count() == 1 && !SHORT_STEM_PARTICLES.contains(&particle) {
        return false;
    }

    let Some(final_jamo) = final_consonant(last) else {
        return true;
    };
    if AFTER_CONSONANT.contains(&particle) {
        return final_jamo != 0;
    }
    if AFTER_VOWEL.contains(&particle) {
        let rieul_ok = particle.starts_with('로') && final_jamo == FINAL_RIEUL;
        return final_jamo == 0 || rieul_ok;
    }
    true
}

/// Classify one trimmed token as a noun (with its particle removed) or a break.
fn classify(token: &str) -> Unit {
    // Split a Latin/digit head from a Hangul tail: "AI가" -> ("AI", "가").
    let head_end = token
        .char_indices()
        .find(|(_, c)| is_hangul(*c))
        .map(|(i, _)| i)
        .unwrap_or(token.len());

    if head_end > 0 {
        let head = &token[..head_end];
        let tail = &token[head_end..];
        if tail.is_empty() {
            return Unit::Noun {
                stem: head.to_string(),
                joined: true,
            };
        }
        if let Some(particle) = PARTICLES.iter().find(|p| tail == **p) {
            return Unit::Noun {
                stem: head.to_string(),
                joined: CONNECTIVES.contains(particle),
            };
        }
        // Latin head followed by a Hangul word ("AI기술") stays one compound.
    }

    if !token.chars().any(is_hangul) {
        return Unit::Noun {
            stem: token.to_string(),
            joined: true,
        };
    }

    if is_known_noun(token) {
        return Unit::Noun {
            stem: token.to_string(),
            joined: true,
        };
    }

    // A split that leaves a known noun wins over a longer particle match.
    let split = split_particle(token, |stem, _| is_known_noun(stem))
        .or_else(|| split_particle(token, valid_stem));
    if let Some((stem, particle)) = split {
        return Unit::Noun {
            stem: stem.to_string(),
            joined: CONNECTIVES.contains(&particle),
        };
    }

    if token.chars().count() > 1 && PREDICATE_ENDINGS.iter().any(|e| token.ends_with(e)) {
        return Unit::Break;
    }

    Unit::Noun {
        stem: token.to_string(),
        joined: true,
    }
}
