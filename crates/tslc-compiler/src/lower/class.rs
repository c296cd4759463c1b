//! Class lowering
//!
//! A class becomes a named struct of its properties plus free functions:
//! `get_<field>_<Class>`, `set_<field>_<Class>`, `allocate_<Class>`,
//! `<Class>_constructor` and `<Class>_<method>` for each method. Methods take
//! the receiver as their last parameter.

use super::manifest::{ClassEntry, FieldEntry, FunctionEntry};
use super::symbols::StorageDescriptor;
use super::{FunctionState, Lowerer};
use crate::error::{CompileError, CompileResult};
use crate::frontend::ast::{ClassDecl, ClassMember, ConstructorDecl};
use crate::frontend::SourceType;
use crate::ir::buffer::MALLOC;
use crate::ir::{map_type, Instruction, IrType, Operand, StructDef};
use std::rc::Rc;

/// Property order of a class, fixed once per compilation unit
#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    pub name: String,
    pub fields: Vec<(String, SourceType)>,
}

impl StructLayout {
    /// Index and type of a property
    pub fn field(&self, name: &str) -> Option<(u32, &SourceType)> {
        self.fields
            .iter()
            .position(|(field, _)| field == name)
            .map(|index| (index as u32, &self.fields[index].1))
    }

    pub fn pointer_type(&self) -> IrType {
        IrType::StructPtr(self.name.clone())
    }

    pub fn getter_name(&self, field: &str) -> String {
        format!("get_{}_{}", field, self.name)
    }

    pub fn setter_name(&self, field: &str) -> String {
        format!("set_{}_{}", field, self.name)
    }

    pub fn allocator_name(&self) -> String {
        format!("allocate_{}", self.name)
    }

    pub fn constructor_name(&self) -> String {
        format!("{}_constructor", self.name)
    }

    pub fn method_name(&self, method: &str) -> String {
        format!("{}_{}", self.name, method)
    }
}

impl<'a> Lowerer<'a> {
    /// Layout of `class`, computed from the front end on first use
    pub(super) fn struct_layout(&mut self, class: &str) -> CompileResult<Rc<StructLayout>> {
        if let Some(layout) = self.layouts.get(class) {
            return Ok(Rc::clone(layout));
        }
        let declared = self
            .front
            .class_layout(class)
            .ok_or_else(|| CompileError::UnknownClass {
                name: class.to_string(),
            })?;
        let layout = Rc::new(StructLayout {
            name: declared.name.clone(),
            fields: declared
                .properties()
                .map(|(name, ty)| (name.to_string(), ty.clone()))
                .collect(),
        });
        self.layouts.insert(class.to_string(), Rc::clone(&layout));
        Ok(layout)
    }

    pub(super) fn lower_class(&mut self, class: &ClassDecl) -> CompileResult<()> {
        log::debug!("lowering class {}", class.name);
        let layout = self.struct_layout(&class.name)?;

        let field_types = layout
            .fields
            .iter()
            .map(|(_, ty)| map_type(Some(ty), true))
            .collect::<CompileResult<Vec<_>>>()?;
        self.buffer.emit_struct(StructDef {
            name: layout.name.clone(),
            fields: field_types.clone(),
        });

        let mut fields = Vec::with_capacity(layout.fields.len());
        for (index, ((name, _), ty)) in layout.fields.iter().zip(&field_types).enumerate() {
            let index = index as u32;
            self.lower_getter(&layout, name, index, ty)?;
            self.lower_setter(&layout, name, index, ty)?;
            fields.push(FieldEntry {
                name: name.clone(),
                ty: ty.to_string(),
                index,
                getter: layout.getter_name(name),
                setter: layout.setter_name(name),
            });
        }

        self.lower_allocator(&layout)?;

        let ctor = class.members.iter().find_map(|m| match m {
            ClassMember::Constructor(ctor) => Some(ctor),
            _ => None,
        });
        let constructor = self.lower_constructor(&layout, class, ctor)?;

        let mut methods = Vec::new();
        for member in &class.members {
            if let ClassMember::Method(method) = member {
                let signature = self
                    .front
                    .class_layout(&class.name)
                    .and_then(|l| l.method(&method.name))
                    .cloned()
                    .ok_or_else(|| {
                        CompileError::internal(format!(
                            "no signature for method {}.{}",
                            class.name, method.name
                        ))
                    })?;
                let ir_name = layout.method_name(&method.name);
                log::debug!("lowering method {}", ir_name);
                let (ret, params) = self.lower_callable(
                    &ir_name,
                    &method.params,
                    &signature.params,
                    signature.ret,
                    Some(&layout.name),
                    &method.body,
                )?;
                methods.push(FunctionEntry::new(&ir_name, &ret, &params));
            }
        }

        self.manifest.classes.push(ClassEntry {
            name: layout.name.clone(),
            allocator: layout.allocator_name(),
            constructor,
            fields,
            methods,
        });
        Ok(())
    }

    fn lower_getter(&mut self, layout: &StructLayout, field: &str, index: u32, ty: &IrType) -> CompileResult<()> {
        self.buffer
            .begin_function(&layout.getter_name(field), ty.clone(), vec![layout.pointer_type()])?;
        let addr = self.buffer.new_register();
        self.buffer.emit(Instruction::FieldAddress {
            dest: addr,
            class: layout.name.clone(),
            base: Operand::Param(0),
            index,
        });
        let value = self.buffer.new_register();
        self.buffer.emit(Instruction::Load {
            dest: value,
            ty: ty.clone(),
            addr: addr.into(),
        });
        self.buffer.emit(Instruction::Return {
            ty: ty.clone(),
            value: Some(value.into()),
        });
        self.buffer.end_function()
    }

    fn lower_setter(&mut self, layout: &StructLayout, field: &str, index: u32, ty: &IrType) -> CompileResult<()> {
        self.buffer.begin_function(
            &layout.setter_name(field),
            IrType::Void,
            vec![layout.pointer_type(), ty.clone()],
        )?;
        let addr = self.buffer.new_register();
        self.buffer.emit(Instruction::FieldAddress {
            dest: addr,
            class: layout.name.clone(),
            base: Operand::Param(0),
            index,
        });
        self.buffer.emit(Instruction::Store {
            ty: ty.clone(),
            value: Operand::Param(1),
            addr: addr.into(),
        });
        self.buffer.emit(Instruction::Return {
            ty: IrType::Void,
            value: None,
        });
        self.buffer.end_function()
    }

    /// `allocate_<Class>`: heap storage sized by the struct
    fn lower_allocator(&mut self, layout: &StructLayout) -> CompileResult<()> {
        let ptr = layout.pointer_type();
        self.buffer
            .begin_function(&layout.allocator_name(), ptr.clone(), vec![])?;
        let size = self.buffer.new_register();
        self.buffer.emit(Instruction::SizeOf {
            dest: size,
            class: layout.name.clone(),
        });
        let bytes = self.buffer.new_register();
        self.buffer.emit(Instruction::PtrToInt {
            dest: bytes,
            class: layout.name.clone(),
            src: size,
        });
        let raw = self.buffer.new_register();
        self.buffer.emit(Instruction::Call {
            dest: raw,
            ret: IrType::BytePtr,
            callee: MALLOC.to_string(),
            args: vec![(IrType::I32, bytes.into())],
        });
        let object = self.buffer.new_register();
        self.buffer.emit(Instruction::BitCast {
            dest: object,
            src: raw,
            class: layout.name.clone(),
        });
        self.buffer.emit(Instruction::Return {
            ty: ptr,
            value: Some(object.into()),
        });
        self.buffer.end_function()
    }

    /// `<Class>_constructor`: allocate, run field initializers, then the body
    /// with `this` bound to a stack slot holding the new object
    fn lower_constructor(
        &mut self,
        layout: &StructLayout,
        class: &ClassDecl,
        ctor: Option<&ConstructorDecl>,
    ) -> CompileResult<FunctionEntry> {
        let name = layout.constructor_name();
        log::debug!("lowering constructor {}", name);
        let ptr = layout.pointer_type();
        let param_types = self
            .front
            .class_layout(&class.name)
            .and_then(|l| l.constructor())
            .map(|sig| sig.params.clone())
            .unwrap_or_default();
        let ir_params = param_types
            .iter()
            .map(|ty| map_type(Some(ty), true))
            .collect::<CompileResult<Vec<_>>>()?;

        self.symbols.clear();
        if let Some(ctor) = ctor {
            for (index, param) in ctor.params.iter().enumerate() {
                self.symbols
                    .bind(&param.name, StorageDescriptor::param(index as u32));
            }
        }
        self.buffer.begin_function(&name, ptr.clone(), ir_params.clone())?;

        let object = self.buffer.new_register();
        self.buffer.emit(Instruction::Call {
            dest: object,
            ret: ptr.clone(),
            callee: layout.allocator_name(),
            args: vec![],
        });
        let slot = self.buffer.new_register();
        self.buffer.emit(Instruction::Alloca {
            dest: slot,
            ty: ptr.clone(),
        });
        self.buffer.emit(Instruction::Store {
            ty: ptr.clone(),
            value: object.into(),
            addr: slot.into(),
        });
        self.symbols.bind("this", StorageDescriptor::slot(slot));
        self.function = Some(FunctionState {
            name: name.clone(),
            ret: SourceType::Class(layout.name.clone()),
            this_slot: Some((slot, layout.name.clone())),
        });

        for member in &class.members {
            if let ClassMember::Field(field) = member {
                if let Some(init) = &field.init {
                    let (index, ty) = layout.field(&field.name).ok_or_else(|| CompileError::UnknownField {
                        class: layout.name.clone(),
                        field: field.name.clone(),
                    })?;
                    let ir = map_type(Some(ty), true)?;
                    let (value, _) = self.lower_value(init)?;
                    let addr = self.buffer.new_register();
                    self.buffer.emit(Instruction::FieldAddress {
                        dest: addr,
                        class: layout.name.clone(),
                        base: object.into(),
                        index,
                    });
                    self.buffer.emit(Instruction::Store {
                        ty: ir,
                        value,
                        addr: addr.into(),
                    });
                }
            }
        }

        let ctx = match ctor {
            Some(ctor) => self.lower_block(&ctor.body)?,
            None => Default::default(),
        };
        self.close_body(ctx)?;
        self.buffer.end_function()?;
        self.function = None;
        Ok(FunctionEntry::new(&name, &ptr, &ir_params))
    }
}
