//! URL slugs for Japanese names
//!
//! NFKC normalization, a handful of loanword phrases, then Hepburn-style
//! romanization of hiragana and katakana. Anything left that is not
//! `[a-z0-9-]` becomes a hyphen.

use regex_lite::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

pub const MAX_SLUG_CHARS: usize = 50;

const LOANWORDS: &[(&str, &str)] = &[
    ("テクノロジー", "technology"),
    ("ビジネス", "business"),
    ("ライフスタイル", "lifestyle"),
    ("デザイン", "design"),
    ("プログラミング", "programming"),
    ("マーケティング", "marketing"),
    ("デベロップメント", "development"),
];

static INVALID_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").unwrap());

static HYPHENS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

/// Slug of at most 50 characters matching `^[a-z0-9-]+$`.
///
/// Falls back to [`short_hash`] when nothing survives.
pub fn slugify(name: &str) -> String {
    let mut slug: String = name.nfkc().collect::<String>().to_lowercase();

    for (phrase, word) in LOANWORDS {
        if slug.contains(phrase) {
            slug = slug.replace(phrase, &format!("-{}-", word));
        }
    }

    let slug = romanize(&slug);
    let slug = INVALID_RUN_RE.replace_all(&slug, "-");
    let slug = HYPHENS_RE.replace_all(&slug, "-");
    let mut slug = slug.trim_matches('-').to_string();

    if slug.len() > MAX_SLUG_CHARS {
        slug.truncate(MAX_SLUG_CHARS);
        slug = slug.trim_end_matches('-').to_string();
    }

    if slug.is_empty() {
        short_hash(name)
    } else {
        slug
    }
}

/// First 8 hex characters of the SHA-256 of `value`
pub fn short_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest)[..8].to_string()
}

/// Romanize kana; other characters pass through unchanged
pub fn romanize(text: &str) -> String {
    let chars: Vec<char> = text.chars().map(katakana_to_hiragana).collect();
    let mut out = String::with_capacity(text.len());
    let mut geminate = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == 'っ' {
            geminate = true;
            i += 1;
            continue;
        }
        // Prolonged sound mark
        if c == 'ー' {
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (romaji, consumed) = match next.and_then(|n| combine(c, n)) {
            Some(combined) => (Some(combined), 2),
            None => (syllable(c).map(str::to_string), 1),
        };

        match romaji {
            Some(romaji) => {
                if geminate {
                    if let Some(first) = romaji.chars().next().filter(|f| !is_vowel(*f)) {
                        out.push(first);
                    }
                }
                out.push_str(&romaji);
            }
            None => out.push(c),
        }

        geminate = false;
        i += consumed;
    }

    out
}

fn katakana_to_hiragana(c: char) -> char {
    match c {
        'ァ'..='ヶ' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
        _ => c,
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'i' | 'u' | 'e' | 'o')
}

/// Two-kana combinations: youon (きゃ) and small-vowel loan sounds (ふぁ)
fn combine(base: char, small: char) -> Option<String> {
    let glide = match small {
        'ゃ' => Some("a"),
        'ゅ' => Some("u"),
        'ょ' => Some("o"),
        _ => None,
    };

    if let Some(vowel) = glide {
        let onset = match base {
            'き' => "ky",
            'ぎ' => "gy",
            'し' => "sh",
            'じ' => "j",
            'ち' => "ch",
            'ぢ' => "j",
            'に' => "ny",
            'ひ' => "hy",
            'び' => "by",
            'ぴ' => "py",
            'み' => "my",
            'り' => "ry",
            _ => return None,
        };
        return Some(format!("{}{}", onset, vowel));
    }

    let vowel = match small {
        'ぁ' => "a",
        'ぃ' => "i",
        'ぅ' => "u",
        'ぇ' => "e",
        'ぉ' => "o",
        _ => return None,
    };
    let onset = match base {
        'う' => "w",
        'ゔ' => "v",
        'ふ' => "f",
        'て' => "t",
        'で' => "d",
        'し' => "sh",
        'じ' => "j",
        'ち' => "ch",
        _ => return None,
    };
    Some(format!("{}{}", onset, vowel))
}

fn syllable(c: char) -> Option<&'static str> {
    let romaji = match c {
        'あ' => "a", 'い' => "i", 'う' => "u", 'え' => "e", 'お' => "o",
        'か' => "ka", 'き' => "ki", 'く' => "ku", 'け' => "ke", 'こ' => "ko",
        'が' => "ga", 'ぎ' => "gi", 'ぐ' => "gu", 'げ' => "ge", 'ご' => "go",
        'さ' => "sa", 'し' => "shi", 'す' => "su", 'せ' => "se", 'そ' => "so",
        'ざ' => "za", 'じ' => "ji", 'ず' => "zu", 'ぜ' => "ze", 'ぞ' => "zo",
        'た' => "ta", 'ち' => "chi", 'つ' => "tsu", 'て' => "te", 'と' => "to",
        'だ' => "da", 'ぢ' => "ji", 'づ' => "zu", 'で' => "de", 'ど' => "do",
        'な' => "na", 'に' => "ni", 'ぬ' => "nu", 'ね' => "ne", 'の' => "no",
        'は' => "ha", 'ひ' => "hi", 'ふ' => "fu", 'へ' => "he", 'ほ' => "ho",
        'ば' => "ba", 'び' => "bi", 'ぶ' => "bu", 'べ' => "be", 'ぼ' => "bo",
        'ぱ' => "pa", 'ぴ' => "pi", 'ぷ' => "pu", 'ぺ' => "pe", 'ぽ' => "po",
        'ま' => "ma", 'み' => "mi", 'む' => "mu", 'め' => "me", 'も' => "mo",
        'や' => "ya", 'ゆ' => "yu", 'よ' => "yo",
        'ら' => "ra", 'り' => "ri", 'る' => "ru", 'れ' => "re", 'ろ' => "ro",
        'わ' => "wa", 'ゐ' => "i", 'ゑ' => "e", 'を' => "wo", 'ん' => "n",
        'ゔ' => "vu",
        'ぁ' => "a", 'ぃ' => "i", 'ぅ' => "u", 'ぇ' => "e", 'ぉ' => "o",
        'ゃ' => "ya", 'ゅ' => "yu", 'ょ' => "yo", 'ゎ' => "wa",
        'ゕ' => "ka", 'ゖ' => "ke",
        _ => return None,
    };
    Some(romaji)
}
