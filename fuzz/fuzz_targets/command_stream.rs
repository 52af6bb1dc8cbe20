#![no_main]

mod common;

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use the_lib::{
  config::EditorConfig,
  editor::Editor,
  markup,
  persistence::MemorySink,
  surface::{
    HeadlessSurface,
    HostSurface,
  },
};

use crate::common::{
  Op,
  ops_from_bytes,
};

fuzz_target!(|data: &[u8]| {
  let mut editor = Editor::new(
    HeadlessSurface::new(),
    Arc::new(MemorySink::new()),
    EditorConfig::default(),
  );

  for op in ops_from_bytes(data) {
    match op {
      Op::Execute(command) => {
        let range = editor.execute(command);
        assert!(editor.document().contains_range(range));
        assert_eq!(
          editor.surface().content(),
          markup::render(editor.document())
        );
      },
      Op::Undo => {
        editor.undo();
      },
      Op::Redo => {
        editor.redo();
      },
      Op::Input(content) => {
        editor.surface_mut().set_content(&content);
        editor.handle_input(&content).expect("rendered markup must parse");
      },
      Op::Select(range) => editor.surface_mut().select(range),
      Op::Blur => editor.surface_mut().blur(),
    }

    let history = editor.history();
    if let Some(cursor) = history.cursor() {
      assert!(cursor < history.len());
      assert_eq!(history.current(), Some(editor.document()));
    }
  }
});
