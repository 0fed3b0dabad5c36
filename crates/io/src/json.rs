// JSON export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::IoError;

/// Write any serializable report document as pretty JSON.
pub fn export<T: Serialize>(value: &T, path: &Path) -> Result<(), IoError> {
    let file = File::create(path).map_err(|e| IoError::write(path, e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| IoError::write(path, e))?;
    writer.write_all(b"\n").map_err(|e| IoError::write(path, e))?;
    writer.flush().map_err(|e| IoError::write(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use valida_recon::Table;

    #[test]
    fn export_table_as_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("verificar.json");

        let mut table = Table::new(vec!["cpf".into(), "Status".into()]);
        table.push_row(["111", "Identifier not found"]);
        export(&table, &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["columns"][1], "Status");
        assert_eq!(value["rows"][0]["cpf"], "111");
        assert_eq!(value["rows"][0]["Status"], "Identifier not found");
    }
}
