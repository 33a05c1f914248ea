mod lifecycle;
mod lookup_ops;
mod metadata_ops;
mod rename_remove;
mod special_nodes;
