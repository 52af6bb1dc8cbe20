#![no_main]

use libfuzzer_sys::fuzz_target;
use the_lib::markup;

fuzz_target!(|data: &[u8]| {
  let Ok(input) = std::str::from_utf8(data) else {
    return;
  };
  let Ok(document) = markup::parse(input) else {
    return;
  };

  let rendered = markup::render(&document);
  let reparsed = markup::parse(&rendered).expect("canonical markup must parse");
  assert_eq!(reparsed, document);
});
