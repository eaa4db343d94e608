/*!
# lexring

A compact pronunciation-lexicon engine: an exception dictionary, an
implicit-base dictionary, and three-to-four ordered regex rule programs,
composed into one search pipeline over an inflected natural language.

A word is looked up in three stages, each optional via [`SearchFlags`]:

1. The exception dictionary — an exact-form override.
2. The implicit-base dictionary — [`rules::RuleKind::LexicalClass`] rules
   strip inflectional endings down to a base form, which is looked up in
   turn.
3. General stress-guessing rules, as a last resort.

A hit from any stage is finished off by the corrector ruleset. Dictionary
values are never stored as plain strings: each is packed as a diff script
(see [`diff_codec`]) relative to an arithmetic-coded key (see
[`key_codec`]), so that common prefixes compress away and a miss costs
only a handful of comparisons.

```
use lexring::{LexiconEngine, Mode, PutTarget, SearchFlags};
use tempfile::tempdir;

let dir = tempdir().unwrap();
let mut engine = LexiconEngine::open(dir.path().join("demo.redb"), Mode::Create).unwrap();
engine.put("cadidio", "ca+didio", PutTarget::Exception, false).unwrap();

let result = engine.search("cadidio", SearchFlags::ALL).unwrap();
assert!(result.hit);
assert_eq!(result.value, "ca+didio");
```
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod alphabet;
pub mod config;
pub mod diff_codec;
pub mod engine;
pub mod error;
pub mod key_codec;
pub mod rules;
pub mod store;

pub use config::Config;
pub use engine::{
    Classification, Dict, LexiconEngine, Mode, PutTarget, RuleTarget, SearchFlags, SearchResult,
    SeqTarget,
};
pub use error::{DiffCodecError, KeyCodecError, LexError, LexResult};
pub use rules::RuleKind;
pub use store::SeqDirection;
