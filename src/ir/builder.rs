use super::*;

/// Builds the body of a single function one basic block at a time.
///
/// Registers (`%N`) and labels (`prefixN`) are numbered per function, so two
/// functions built side by side never share names. Stack slots are hoisted to
/// the top of the entry block no matter where they are requested.
#[derive(Debug)]
pub struct FunctionBuilder {
    function: Function,
    current_block: usize,
    register_counter: usize,
    label_counter: usize,
    allocas: usize,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>, params: Vec<(String, IRType)>, return_type: IRType) -> Self {
        let mut builder = Self {
            function: Function {
                name: name.into(),
                params,
                return_type,
                blocks: Vec::new(),
                is_external: false,
                is_variadic: false,
            },
            current_block: 0,
            register_counter: 0,
            label_counter: 0,
            allocas: 0,
        };
        let entry = builder.create_block("entry".to_string());
        builder.set_current_block(entry);
        builder
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn new_register(&mut self) -> String {
        self.register_counter += 1;
        format!("%{}", self.register_counter)
    }

    /// A fresh register that still shows which variable it belongs to.
    pub fn new_named_register(&mut self, hint: &str) -> String {
        self.register_counter += 1;
        format!("%{}.{}", hint, self.register_counter)
    }

    pub fn new_label(&mut self, prefix: &str) -> String {
        self.label_counter += 1;
        format!("{}{}", prefix, self.label_counter)
    }

    pub fn add_instruction(&mut self, instruction: Instruction) {
        self.function.blocks[self.current_block]
            .instructions
            .push(instruction);
    }

    /// Reserves a stack slot in the entry block and returns its register.
    pub fn add_alloca(&mut self, hint: &str, ty: IRType, span: Range<usize>) -> String {
        let dest = self.new_named_register(hint);
        self.function.blocks[0].instructions.insert(
            self.allocas,
            Instruction::Alloca {
                dest: dest.clone(),
                ty,
                span,
            },
        );
        self.allocas += 1;
        dest
    }

    /// Sets the terminator of the current block unless it already has one.
    pub fn set_terminator(&mut self, terminator: Terminator) {
        let block = &mut self.function.blocks[self.current_block];
        if block.terminator.is_none() {
            block.terminator = Some(terminator);
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.function.blocks[self.current_block].terminator.is_some()
    }

    pub fn create_block(&mut self, label: String) -> usize {
        self.function.blocks.push(BasicBlock {
            label,
            instructions: Vec::new(),
            terminator: None,
        });
        self.function.blocks.len() - 1
    }

    pub fn set_current_block(&mut self, block_idx: usize) {
        self.current_block = block_idx;
    }

    pub fn current_label(&self) -> &str {
        &self.function.blocks[self.current_block].label
    }

    /// True if the current block can be reached from the entry block
    /// through the terminators placed so far.
    pub fn current_is_reachable(&self) -> bool {
        let blocks = &self.function.blocks;
        let mut seen = vec![false; blocks.len()];
        let mut work = vec![0];
        while let Some(idx) = work.pop() {
            if seen[idx] {
                continue;
            }
            seen[idx] = true;
            if idx == self.current_block {
                return true;
            }
            let Some(terminator) = &blocks[idx].terminator else {
                continue;
            };
            for label in terminator.successors() {
                if let Some(next) = blocks.iter().position(|b| b.label == label) {
                    work.push(next);
                }
            }
        }
        false
    }

    pub fn finish(self) -> Function {
        self.function
    }
}
