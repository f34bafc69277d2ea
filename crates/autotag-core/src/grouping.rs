use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use tracing::debug;

use crate::{error::SpecError, pipeline::PipelineSpec};

/// Pipelines con la misma clave pueden compartir un único cálculo de embeddings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub data_folder: PathBuf,
    pub embedding_model_path: PathBuf,
    pub sample_rate: u32,
}

impl GroupKey {
    pub fn of(spec: &PipelineSpec) -> Self {
        GroupKey {
            data_folder: spec.data_folder.clone(),
            embedding_model_path: spec.embedding_model_path.clone(),
            sample_rate: spec.sample_rate,
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | {} | {} Hz",
            self.data_folder.display(),
            self.embedding_model_path.display(),
            self.sample_rate
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineGroup {
    pub key: GroupKey,
    /// En el mismo orden en que aparecen en la configuración.
    pub members: Vec<PipelineSpec>,
}

/// Parte la lista ordenada de pipelines habilitados en grupos.
///
/// Los grupos salen en orden de primera aparición de su clave y cada
/// pipeline cae en exactamente un grupo. No hace I/O.
pub fn group_pipelines(specs: &[PipelineSpec]) -> Result<Vec<PipelineGroup>, SpecError> {
    let mut names = HashSet::new();
    for (index, spec) in specs.iter().enumerate() {
        spec.validate(index)?;
        if !names.insert(spec.name.as_str()) {
            return Err(SpecError::DuplicateName(spec.name.clone()));
        }
    }

    let mut groups: Vec<PipelineGroup> = Vec::new();
    let mut index_of: HashMap<GroupKey, usize> = HashMap::new();

    for spec in specs {
        let key = GroupKey::of(spec);
        match index_of.get(&key) {
            Some(&i) => groups[i].members.push(spec.clone()),
            None => {
                index_of.insert(key.clone(), groups.len());
                groups.push(PipelineGroup {
                    key,
                    members: vec![spec.clone()],
                });
            }
        }
    }

    debug!(pipelines = specs.len(), groups = groups.len(), "pipelines agrupados");
    Ok(groups)
}
