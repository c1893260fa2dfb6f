//! EDMX metadata document
//!
//! Renders a [`Catalog`] as an OData 2.0 / EDMX 1.0 schema: one `EntitySet`
//! and one `EntityType` per collection, keyed on the timestamp property.
//! InfluxDB has no real key; timestamps are not guaranteed unique.

use super::{Catalog, CatalogResult, CollectionDescriptor, DataType};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use std::path::Path;

const EDMX_NS: &str = "http://schemas.microsoft.com/ado/2007/06/edmx";
const METADATA_NS: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/metadata";
const EDM_NS: &str = "http://schemas.microsoft.com/ado/2006/04/edm";

/// Naming used when rendering the document
#[derive(Debug, Clone)]
pub struct SchemaDocumentOptions {
    /// Schema namespace; entity types are referenced as `{namespace}.{id}`
    pub namespace: String,
    /// Name of the default entity container
    pub container: String,
    /// Name of the key property carrying point timestamps
    pub timestamp_alias: String,
}

impl Default for SchemaDocumentOptions {
    fn default() -> Self {
        Self {
            namespace: "InfluxDBSchema".to_string(),
            container: "InfluxDB".to_string(),
            timestamp_alias: "timestamp".to_string(),
        }
    }
}

impl SchemaDocumentOptions {
    pub fn with_timestamp_alias(mut self, alias: impl Into<String>) -> Self {
        self.timestamp_alias = alias.into();
        self
    }
}

/// EDM primitive type for a catalog data type
pub fn edm_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Float => "Edm.Double",
        DataType::Integer => "Edm.Int64",
        DataType::String => "Edm.String",
    }
}

/// Render the catalog as an EDMX document
pub fn generate_schema_document(
    catalog: &Catalog,
    options: &SchemaDocumentOptions,
) -> CatalogResult<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("yes"))))?;

    writer.write_event(Event::Start(BytesStart::new("edmx:Edmx").with_attributes([
        ("Version", "1.0"),
        ("xmlns:edmx", EDMX_NS),
        ("xmlns:m", METADATA_NS),
    ])))?;
    writer.write_event(Event::Start(
        BytesStart::new("edmx:DataServices").with_attributes([("m:DataServiceVersion", "2.0")]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("Schema").with_attributes([
        ("Namespace", options.namespace.as_str()),
        ("xmlns", EDM_NS),
    ])))?;

    writer.write_event(Event::Start(BytesStart::new("EntityContainer").with_attributes([
        ("Name", options.container.as_str()),
        ("m:IsDefaultEntityContainer", "true"),
    ])))?;
    for collection in catalog.collections() {
        let entity_type = format!("{}.{}", options.namespace, collection.mangled_id);
        writer.write_event(Event::Empty(BytesStart::new("EntitySet").with_attributes([
            ("Name", collection.mangled_id.as_str()),
            ("EntityType", entity_type.as_str()),
        ])))?;
    }
    writer.write_event(Event::End(BytesEnd::new("EntityContainer")))?;

    for collection in catalog.collections() {
        write_entity_type(&mut writer, collection, &options.timestamp_alias)?;
    }

    writer.write_event(Event::End(BytesEnd::new("Schema")))?;
    writer.write_event(Event::End(BytesEnd::new("edmx:DataServices")))?;
    writer.write_event(Event::End(BytesEnd::new("edmx:Edmx")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Render the catalog and write it to `path`
pub fn write_schema_document(
    catalog: &Catalog,
    options: &SchemaDocumentOptions,
    path: &Path,
) -> CatalogResult<()> {
    let document = generate_schema_document(catalog, options)?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(document.as_bytes())?;
    tracing::info!(path = %path.display(), collections = catalog.len(), "wrote schema document");
    Ok(())
}

fn write_entity_type<W: Write>(
    writer: &mut Writer<W>,
    collection: &CollectionDescriptor,
    timestamp_alias: &str,
) -> CatalogResult<()> {
    writer.write_event(Event::Start(
        BytesStart::new("EntityType").with_attributes([("Name", collection.mangled_id.as_str())]),
    ))?;

    writer.write_event(Event::Start(BytesStart::new("Key")))?;
    writer.write_event(Event::Empty(
        BytesStart::new("PropertyRef").with_attributes([("Name", timestamp_alias)]),
    ))?;
    writer.write_event(Event::End(BytesEnd::new("Key")))?;

    writer.write_event(Event::Empty(BytesStart::new("Property").with_attributes([
        ("Name", timestamp_alias),
        ("Type", "Edm.DateTime"),
        ("Nullable", "false"),
    ])))?;

    for field in &collection.fields {
        if field.name == timestamp_alias {
            tracing::warn!(
                collection = %collection.mangled_id,
                field = %field.name,
                "field shadows the timestamp property; omitted from schema"
            );
            continue;
        }
        writer.write_event(Event::Empty(BytesStart::new("Property").with_attributes([
            ("Name", field.name.as_str()),
            ("Type", edm_type(field.data_type)),
            ("Nullable", "true"),
        ])))?;
    }

    writer.write_event(Event::End(BytesEnd::new("EntityType")))?;
    Ok(())
}
